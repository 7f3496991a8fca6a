//! Config locations and user path expansion

use anyhow::{Context, Result};
use std::path::PathBuf;

/// `$XDG_CONFIG_HOME/dmoji`, usually `~/.config/dmoji`
pub fn dmoji_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("dmoji");
    Ok(config_dir)
}

/// Default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(dmoji_config_dir()?.join("config.toml"))
}

/// Expand `~` and environment variables in a user-supplied path.
///
/// Unknown variables are left as written rather than failing the run.
pub fn expand_user_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
    }
}
