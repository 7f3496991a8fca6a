mod candidates;
mod chooser;
mod common;
mod config;
mod delivery;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufWriter, IsTerminal};
use std::path::PathBuf;

use crate::candidates::{CandidateSource, EmojiDatabase};
use crate::chooser::{ChooserSession, ChooserVariant};
use crate::common::display_server::DisplayServer;
use crate::config::{Config, Overrides};
use crate::delivery::DeliveryKind;
use crate::ui::prelude::*;

const LONG_ABOUT: &str = "\
Calls dmenu with a list of all base emojis known to the Unicode database, \
then copies the selected emoji to the clipboard.

Extra candidates can be read from files with -a. Each line is offered as is; \
text after the separator (\" ;\" by default) is treated as a description and \
is not delivered. Lines starting with the comment marker (\"#\") are ignored.

Exit status: 0 when something was delivered, 1 when nothing was chosen, \
2 on errors.";

/// dmoji main parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = LONG_ABOUT)]
struct Cli {
    /// Use rofi instead of dmenu
    #[arg(short = 'r', long = "rofi")]
    rofi: bool,

    /// Type the choice into the active window instead of copying it
    #[arg(short = 't', long = "type")]
    type_into_window: bool,

    /// Also offer the lines of a file, or of every file in a directory
    #[arg(short = 'a', long = "aux", value_name = "PATH")]
    aux: Vec<PathBuf>,

    /// Only offer auxiliary candidates
    #[arg(long)]
    no_emoji: bool,

    /// Print the candidate list to stdout instead of opening a menu
    #[arg(long)]
    list: bool,

    /// Read this config file instead of ~/.config/dmoji/config.toml
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Activate debug mode
    #[arg(short, long)]
    debug: bool,

    /// Format of diagnostic messages
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            chooser: if self.rofi {
                ChooserVariant::Rofi
            } else {
                ChooserVariant::Dmenu
            },
            delivery: if self.type_into_window {
                DeliveryKind::Type
            } else {
                DeliveryKind::Clipboard
            },
            aux_paths: self.aux.clone(),
            include_unicode: !self.no_emoji,
        }
    }
}

/// How a run ended, mapped onto the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Delivered,
    Listed,
    NoSelection,
    HelperFailed,
}

impl Outcome {
    fn exit_code(self) -> i32 {
        match self {
            Outcome::Delivered | Outcome::Listed => 0,
            Outcome::NoSelection => 1,
            Outcome::HelperFailed => EXIT_FAILURE,
        }
    }
}

const EXIT_FAILURE: i32 = 2;

fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, io::stderr().is_terminal(), cli.debug);

    let code = match run(&cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            emit(Level::Error, "run.failed", &format!("{e:#}"), None);
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<Outcome> {
    let config = Config::load(cli.config.as_deref())?;
    let display = DisplayServer::detect();
    let settings = config
        .resolve(cli.overrides(), display)
        .context("resolving settings")?;

    ui::debug(
        "run.settings",
        &format!(
            "display server {}, chooser `{}`, {} via `{}`",
            display.name(),
            settings.chooser_command,
            settings.delivery.name(),
            settings.delivery_command
        ),
    );

    let database = EmojiDatabase;
    let candidates = CandidateSource::from_settings(&database, &settings);

    if cli.list {
        return list(candidates, &settings.separator);
    }

    let selection = ChooserSession::run(
        settings.chooser,
        &settings.chooser_command,
        settings.max_line_length,
        candidates,
        &settings.separator,
    )
    .with_context(|| format!("running {}", settings.chooser.name()))?;

    let Some(raw) = selection.raw_line else {
        ui::debug(
            "run.no_selection",
            &format!("nothing chosen (status {})", selection.exit_code),
        );
        return Ok(Outcome::NoSelection);
    };

    let cleaned = chooser::clean(&raw, &settings.separator);
    ui::debug(
        "run.choice",
        &format!(
            "choice is '{}'{}",
            cleaned.text,
            if cleaned.truncated {
                " (description removed)"
            } else {
                ""
            }
        ),
    );

    let backend = delivery::backend_for(settings.delivery, settings.delivery_command.clone());
    let delivered = backend
        .deliver(&cleaned.text)
        .with_context(|| format!("delivering via {}", backend.name()))?;

    if delivered.success() {
        Ok(Outcome::Delivered)
    } else {
        Ok(Outcome::HelperFailed)
    }
}

fn list(source: CandidateSource<'_>, separator: &str) -> Result<Outcome> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match candidates::write_all(&mut out, source, separator) {
        Ok(count) => {
            ui::debug("run.listed", &format!("listed {count} candidates"));
            Ok(Outcome::Listed)
        }
        // Reader went away, e.g. `dmoji --list | head`
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(Outcome::Listed),
        Err(e) => Err(e).context("writing candidate list"),
    }
}
