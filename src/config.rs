//! Configuration file and resolved run settings
//!
//! `Config` mirrors `~/.config/dmoji/config.toml`. Every field has a default,
//! so an empty or missing file is valid. Command-line flags are folded in by
//! [`Config::resolve`], which produces the immutable [`Settings`] threaded
//! through the pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::chooser::ChooserVariant;
use crate::common::display_server::DisplayServer;
use crate::common::paths;
use crate::common::shell::{command_line, split_command};
use crate::delivery::DeliveryKind;

pub const DEFAULT_SEPARATOR: &str = " ;";
pub const DEFAULT_MAX_LINE_LENGTH: usize = 128;
/// Code points up to U+00FF carry the Emoji property for digits, `#`, `*`,
/// `©` and `®`; they are left out of the menu.
pub const DEFAULT_LOW_WATER_MARK: u32 = 0x100;
pub const DEFAULT_COMMENT_MARKER: &str = "#";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("separator must not be empty")]
    EmptySeparator,

    #[error("separator must not contain a newline")]
    SeparatorNewline,

    #[error("max_line_length must be greater than zero")]
    ZeroLineLength,

    #[error("comment_marker must not be empty")]
    EmptyCommentMarker,

    #[error("low_water_mark {0:#x} is beyond the last Unicode code point")]
    LowWaterMarkOutOfRange(u32),

    #[error("invalid `{name}` command: {reason}")]
    InvalidCommand { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Joins payload and description on each candidate line
    pub separator: String,
    /// Upper bound for the chooser's answer, in bytes
    pub max_line_length: usize,
    /// Code points below this value are never offered
    pub low_water_mark: u32,
    /// Auxiliary lines starting with this marker are dropped
    pub comment_marker: String,
    /// Auxiliary files or directories always included
    pub aux_paths: Vec<String>,
    pub commands: CommandsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            comment_marker: DEFAULT_COMMENT_MARKER.to_string(),
            aux_paths: Vec::new(),
            commands: CommandsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub dmenu: String,
    pub rofi: String,
    /// Defaults to `xsel`/`xclip` on X11 and `wl-copy` on Wayland
    pub clipboard: Option<String>,
    /// Defaults to `xdotool type` on X11 and `wtype` on Wayland
    pub typer: Option<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            dmenu: ChooserVariant::Dmenu.default_command().to_string(),
            rofi: ChooserVariant::Rofi.default_command().to_string(),
            clipboard: None,
            typer: None,
        }
    }
}

/// A helper program and its fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn parse(name: &'static str, raw: &str) -> Result<Self, ConfigError> {
        let (program, args) = split_command(raw).map_err(|e| ConfigError::InvalidCommand {
            name,
            reason: format!("{e:#}"),
        })?;
        Ok(Self { program, args })
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&command_line(&self.program, &self.args))
    }
}

/// What the command line asks for on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub chooser: ChooserVariant,
    pub delivery: DeliveryKind,
    pub aux_paths: Vec<PathBuf>,
    pub include_unicode: bool,
}

/// Everything one run needs, resolved once.
#[derive(Debug, Clone)]
pub struct Settings {
    pub separator: String,
    pub max_line_length: usize,
    pub low_water_mark: u32,
    pub comment_marker: String,
    pub include_unicode: bool,
    pub aux_paths: Vec<PathBuf>,
    pub chooser: ChooserVariant,
    pub chooser_command: CommandSpec,
    pub delivery: DeliveryKind,
    pub delivery_command: CommandSpec,
}

impl Config {
    /// Load the config file.
    ///
    /// With no explicit path the default location is used and a missing
    /// file means defaults. An explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = paths::default_config_path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        if self.separator.contains('\n') {
            return Err(ConfigError::SeparatorNewline);
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::ZeroLineLength);
        }
        if self.comment_marker.is_empty() {
            return Err(ConfigError::EmptyCommentMarker);
        }
        if self.low_water_mark > char::MAX as u32 + 1 {
            return Err(ConfigError::LowWaterMarkOutOfRange(self.low_water_mark));
        }
        CommandSpec::parse("dmenu", &self.commands.dmenu)?;
        CommandSpec::parse("rofi", &self.commands.rofi)?;
        if let Some(raw) = &self.commands.clipboard {
            CommandSpec::parse("clipboard", raw)?;
        }
        if let Some(raw) = &self.commands.typer {
            CommandSpec::parse("typer", raw)?;
        }
        Ok(())
    }

    /// Fold command-line choices into the final settings.
    pub fn resolve(&self, overrides: Overrides, display: DisplayServer) -> Result<Settings, ConfigError> {
        self.validate()?;

        let chooser_command = match overrides.chooser {
            ChooserVariant::Dmenu => CommandSpec::parse("dmenu", &self.commands.dmenu)?,
            ChooserVariant::Rofi => CommandSpec::parse("rofi", &self.commands.rofi)?,
        };

        let delivery_command = match overrides.delivery {
            DeliveryKind::Clipboard => match &self.commands.clipboard {
                Some(raw) => CommandSpec::parse("clipboard", raw)?,
                None => {
                    let (program, args) = display.clipboard_set_command();
                    CommandSpec::new(program, &args)
                }
            },
            DeliveryKind::Type => match &self.commands.typer {
                Some(raw) => CommandSpec::parse("typer", raw)?,
                None => {
                    let (program, args) = display.type_command();
                    CommandSpec::new(program, &args)
                }
            },
        };

        let mut aux_paths: Vec<PathBuf> = self
            .aux_paths
            .iter()
            .map(|raw| paths::expand_user_path(raw))
            .collect();
        aux_paths.extend(overrides.aux_paths);

        Ok(Settings {
            separator: self.separator.clone(),
            max_line_length: self.max_line_length,
            low_water_mark: self.low_water_mark,
            comment_marker: self.comment_marker.clone(),
            include_unicode: overrides.include_unicode,
            aux_paths,
            chooser: overrides.chooser,
            chooser_command,
            delivery: overrides.delivery,
            delivery_command,
        })
    }
}
