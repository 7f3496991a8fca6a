//! Delivery of the chosen payload
//!
//! Every backend runs one helper program to completion and reports its exit
//! status. The clipboard helper gets the payload on stdin, the typing helper
//! as its last argument.

use std::io;
use std::process::ExitStatus;

use serde_json::json;

use crate::common::process::{self, ProcessError};
use crate::config::CommandSpec;
use crate::ui::{self, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryKind {
    #[default]
    Clipboard,
    Type,
}

impl DeliveryKind {
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryKind::Clipboard => "clipboard",
            DeliveryKind::Type => "type",
        }
    }
}

/// Exit status of a delivery helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub helper: String,
    pub exit_code: i32,
}

impl Delivered {
    fn from_status(helper: &str, status: ExitStatus) -> Self {
        let delivered = Self {
            helper: helper.to_string(),
            exit_code: process::exit_code(status),
        };
        if !delivered.success() {
            ui::emit(
                Level::Warn,
                "delivery.helper_failed",
                &format!(
                    "{} seems to have returned an unusual exit: '{}'",
                    delivered.helper, delivered.exit_code
                ),
                Some(json!({ "helper": delivered.helper, "status": delivered.exit_code })),
            );
        }
        delivered
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

pub trait DeliveryBackend {
    fn name(&self) -> &'static str;

    /// Hand `payload` to the helper and wait for it to finish.
    fn deliver(&self, payload: &str) -> Result<Delivered, ProcessError>;
}

/// Writes the payload to a clipboard helper's stdin.
#[derive(Debug, Clone)]
pub struct ClipboardWriter {
    command: CommandSpec,
}

impl ClipboardWriter {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

impl DeliveryBackend for ClipboardWriter {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn deliver(&self, payload: &str) -> Result<Delivered, ProcessError> {
        let mut channel = process::spawn_piped(&self.command.program, &self.command.args)?;
        // The helper's output is never read.
        channel.close_output()?;

        ui::debug(
            "delivery.clipboard",
            &format!("sending to {}: '{}'", self.command.program, payload),
        );
        match channel.write_all(payload.as_bytes()) {
            Ok(()) => {}
            // The helper quit without reading; its status says why.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Err(source) => {
                return Err(ProcessError::Io {
                    program: self.command.program.clone(),
                    source,
                });
            }
        }
        channel.close_input()?;

        let (status, _) = channel.wait()?;
        Ok(Delivered::from_status(&self.command.program, status))
    }
}

/// Types the payload into the focused window.
#[derive(Debug, Clone)]
pub struct WindowTyper {
    command: CommandSpec,
}

impl WindowTyper {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }

    fn args_for(&self, payload: &str) -> Vec<String> {
        let mut args = self.command.args.clone();
        args.push(payload.to_string());
        args
    }
}

impl DeliveryBackend for WindowTyper {
    fn name(&self) -> &'static str {
        "type"
    }

    fn deliver(&self, payload: &str) -> Result<Delivered, ProcessError> {
        let status = process::run_to_completion(&self.command.program, &self.args_for(payload))?;
        Ok(Delivered::from_status(&self.command.program, status))
    }
}

pub fn backend_for(kind: DeliveryKind, command: CommandSpec) -> Box<dyn DeliveryBackend> {
    match kind {
        DeliveryKind::Clipboard => Box::new(ClipboardWriter::new(command)),
        DeliveryKind::Type => Box::new(WindowTyper::new(command)),
    }
}
