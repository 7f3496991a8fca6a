//! Diagnostics on stderr
//!
//! Every message carries a stable dotted code (`aux.open_failed`,
//! `chooser.unusual_exit`, ...) so `--output json` consumers can match on it.
//! stdout is reserved for `--list` and clap's help and version text.

use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;

const PROGRAM: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warn,
    Error,
    Debug,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Warn => "warning",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }

    fn paint(self, line: &str) -> String {
        match self {
            Level::Warn => line.yellow().bold().to_string(),
            Level::Error => line.red().bold().to_string(),
            Level::Debug => line.dimmed().to_string(),
        }
    }
}

/// Process-wide diagnostic settings, fixed once the command line is parsed.
#[derive(Debug, Clone, Copy)]
struct Diagnostics {
    format: OutputFormat,
    color: bool,
    debug: bool,
}

lazy_static! {
    static ref DIAGNOSTICS: RwLock<Diagnostics> = RwLock::new(Diagnostics {
        format: OutputFormat::Text,
        color: false,
        debug: false,
    });
}

pub fn init(format: OutputFormat, color: bool, debug: bool) {
    if let Ok(mut d) = DIAGNOSTICS.write() {
        *d = Diagnostics {
            format,
            color: color && format == OutputFormat::Text,
            debug,
        };
    }
}

fn current() -> Diagnostics {
    match DIAGNOSTICS.read() {
        Ok(d) => *d,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

#[derive(Serialize)]
struct Event<'a> {
    program: &'static str,
    level: &'static str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

/// One event as a single line, no trailing newline.
fn render(d: &Diagnostics, level: Level, code: &str, message: &str, data: Option<serde_json::Value>) -> String {
    match d.format {
        OutputFormat::Text => {
            let line = format!("{PROGRAM}: {}: {message}", level.label());
            if d.color { level.paint(&line) } else { line }
        }
        OutputFormat::Json => {
            let event = Event {
                program: PROGRAM,
                level: match level {
                    Level::Warn => "warn",
                    Level::Error => "error",
                    Level::Debug => "debug",
                },
                code,
                message,
                data,
            };
            serde_json::to_string(&event).unwrap_or_else(|_| format!("{PROGRAM}: {message}"))
        }
    }
}

/// Write a diagnostic event to stderr. Debug events need `--debug`.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    let d = current();
    if level == Level::Debug && !d.debug {
        return;
    }
    let line = render(&d, level, code, message, data);
    let _ = writeln!(io::stderr().lock(), "{line}");
}

pub fn debug(code: &str, message: &str) {
    emit(Level::Debug, code, message, None);
}

pub fn warn(code: &str, message: &str) {
    emit(Level::Warn, code, message, None);
}

pub mod prelude {
    pub use super::{Level, OutputFormat, emit};
}
