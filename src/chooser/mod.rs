//! Interactive chooser session
//!
//! One session drives one dmenu-like process through
//! `Created → InputSent → InputClosed → Waited → OutputRead → Done`:
//! candidates are written to its stdin, stdin is closed, the process is
//! reaped, and at most one line is read back from its stdout.
//!
//! Chooser exit codes: 0 means a choice was made, 1 means the user
//! cancelled. Anything else is reported but not fatal.

mod cleaner;

pub use cleaner::clean;

use std::io::{self, BufRead, BufReader, BufWriter, Read};
use std::process::ChildStdout;

use serde_json::json;
use thiserror::Error;

use crate::candidates::Candidate;
use crate::common::process::{self, PipeChannel, ProcessError};
use crate::config::CommandSpec;
use crate::ui::{self, Level};

/// Exit status of a chooser when the user made no choice.
pub const CANCEL_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChooserVariant {
    #[default]
    Dmenu,
    Rofi,
}

impl ChooserVariant {
    pub fn name(&self) -> &'static str {
        match self {
            ChooserVariant::Dmenu => "dmenu",
            ChooserVariant::Rofi => "rofi",
        }
    }

    /// Command line used when the config file does not override it.
    pub fn default_command(&self) -> &'static str {
        match self {
            ChooserVariant::Dmenu => "dmenu -i",
            ChooserVariant::Rofi => "rofi -dmenu -i",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    InputSent,
    InputClosed,
    Waited,
    OutputRead,
    Done,
}

#[derive(Error, Debug)]
pub enum ChooserError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("failed to send candidates to {program}: {source}")]
    Write {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read the answer of {program}: {source}")]
    Read {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("chooser session is {actual:?}, expected {expected}")]
    State {
        expected: &'static str,
        actual: SessionState,
    },
}

/// Outcome of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    /// First output line, with its newline if it had one
    pub raw_line: Option<String>,
    pub exit_code: i32,
}

impl SelectionResult {
    /// Interpret what the chooser produced.
    ///
    /// There is no selection when nothing was read or when the chooser
    /// exited with [`CANCEL_CODE`], whichever happened.
    pub fn resolve(output: &[u8], exit_code: i32) -> Self {
        let raw_line = if output.is_empty() || exit_code == CANCEL_CODE {
            None
        } else {
            Some(String::from_utf8_lossy(output).into_owned())
        };
        Self {
            raw_line,
            exit_code,
        }
    }

    pub fn is_selection(&self) -> bool {
        self.raw_line.is_some()
    }
}

pub struct ChooserSession {
    variant: ChooserVariant,
    program: String,
    channel: Option<PipeChannel>,
    output: Option<ChildStdout>,
    state: SessionState,
    exit_code: Option<i32>,
    answer: Vec<u8>,
    sent: usize,
    max_line_length: usize,
}

impl ChooserSession {
    /// Start the chooser with piped stdin and stdout.
    pub fn spawn(
        variant: ChooserVariant,
        command: &CommandSpec,
        max_line_length: usize,
    ) -> Result<Self, ChooserError> {
        let channel = process::spawn_piped(&command.program, &command.args)?;
        ui::debug(
            "chooser.spawned",
            &format!("{} started as pid {}", variant.name(), channel.id()),
        );
        Ok(Self {
            variant,
            program: command.program.clone(),
            channel: Some(channel),
            output: None,
            state: SessionState::Created,
            exit_code: None,
            answer: Vec::new(),
            sent: 0,
            max_line_length,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Candidates written so far.
    #[cfg(test)]
    pub fn sent(&self) -> usize {
        self.sent
    }

    fn expect(&self, expected: &'static str, allowed: &[SessionState]) -> Result<(), ChooserError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ChooserError::State {
                expected,
                actual: self.state,
            })
        }
    }

    fn channel(&mut self) -> Result<&mut PipeChannel, ChooserError> {
        let state = self.state;
        self.channel.as_mut().ok_or(ChooserError::State {
            expected: "a running chooser",
            actual: state,
        })
    }

    /// Write candidates to the chooser, in iteration order.
    ///
    /// May be called several times before the input is closed. If the
    /// chooser stops reading (it exited or closed its stdin), the remaining
    /// candidates are dropped and the session carries on.
    pub fn send<I>(&mut self, candidates: I, separator: &str) -> Result<usize, ChooserError>
    where
        I: IntoIterator<Item = Candidate>,
    {
        self.expect("Created or InputSent", &[SessionState::Created, SessionState::InputSent])?;
        self.state = SessionState::InputSent;

        let program = self.program.clone();
        let input = self.channel()?.input()?;
        let mut writer = BufWriter::new(input);

        let mut count = 0;
        let mut result = Ok(());
        for candidate in candidates {
            if let Err(e) = candidate.write_line(&mut writer, separator) {
                result = Err(e);
                break;
            }
            count += 1;
        }
        if result.is_ok() {
            result = io::Write::flush(&mut writer);
        }
        drop(writer);
        self.sent += count;

        match result {
            Ok(()) => Ok(count),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                ui::debug(
                    "chooser.input_closed_early",
                    &format!("{program} stopped reading after {} candidates", self.sent),
                );
                Ok(count)
            }
            Err(source) => Err(ChooserError::Write { program, source }),
        }
    }

    /// Signal end of input by closing the chooser's stdin.
    pub fn close_input(&mut self) -> Result<(), ChooserError> {
        self.expect("Created or InputSent", &[SessionState::Created, SessionState::InputSent])?;
        self.channel()?.close_input()?;
        self.state = SessionState::InputClosed;
        ui::debug(
            "chooser.input_done",
            &format!("sent {} candidates to {}", self.sent, self.program),
        );
        Ok(())
    }

    /// Block until the chooser exits and return its exit code.
    pub fn wait(&mut self) -> Result<i32, ChooserError> {
        self.expect("InputClosed", &[SessionState::InputClosed])?;
        let channel = self.channel.take().ok_or(ChooserError::State {
            expected: "a running chooser",
            actual: self.state,
        })?;

        let (status, output) = channel.wait()?;
        let code = process::exit_code(status);
        if code != 0 && code != CANCEL_CODE {
            ui::emit(
                Level::Warn,
                "chooser.unusual_exit",
                &format!("{} seems to have returned an unusual exit: '{}'", self.program, code),
                Some(json!({ "program": self.program, "status": code })),
            );
        }

        self.output = output;
        self.exit_code = Some(code);
        self.state = SessionState::Waited;
        Ok(code)
    }

    /// Read at most one line, bounded by `max_line_length` bytes.
    ///
    /// Stops at the first newline, so a background process left holding the
    /// chooser's stdout does not stall the read. Returns the number of bytes
    /// kept; zero means the chooser printed nothing. The read end is closed
    /// afterwards.
    pub fn read_output(&mut self) -> Result<usize, ChooserError> {
        self.expect("Waited", &[SessionState::Waited])?;

        let mut buf = Vec::new();
        if let Some(output) = self.output.take() {
            BufReader::new(output.take(self.max_line_length as u64))
                .read_until(b'\n', &mut buf)
                .map_err(|source| ChooserError::Read {
                    program: self.program.clone(),
                    source,
                })?;
        }
        trim_partial_utf8(&mut buf);

        ui::debug(
            "chooser.answer",
            &format!("read {} bytes: {:?}", buf.len(), String::from_utf8_lossy(&buf)),
        );

        self.answer = buf;
        self.state = SessionState::OutputRead;
        Ok(self.answer.len())
    }

    /// Interpret the exit code and the answer.
    pub fn finish(mut self) -> Result<SelectionResult, ChooserError> {
        self.expect("OutputRead", &[SessionState::OutputRead])?;
        let exit_code = self.exit_code.unwrap_or(-1);
        let result = SelectionResult::resolve(&self.answer, exit_code);
        if !result.is_selection() {
            ui::debug(
                "chooser.no_choice",
                &format!("no choice from {}", self.variant.name()),
            );
        }
        self.state = SessionState::Done;
        Ok(result)
    }

    /// Run a whole session: spawn, send, close, wait, read, interpret.
    pub fn run<I>(
        variant: ChooserVariant,
        command: &CommandSpec,
        max_line_length: usize,
        candidates: I,
        separator: &str,
    ) -> Result<SelectionResult, ChooserError>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut session = Self::spawn(variant, command, max_line_length)?;
        session.send(candidates, separator)?;
        session.close_input()?;
        session.wait()?;
        session.read_output()?;
        session.finish()
    }
}

/// Drop an incomplete UTF-8 sequence left by the byte bound.
fn trim_partial_utf8(buf: &mut Vec<u8>) {
    if let Err(e) = std::str::from_utf8(buf)
        && e.error_len().is_none()
    {
        buf.truncate(e.valid_up_to());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", &["-c", script])
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::symbol("😀", "GRINNING FACE"),
            Candidate::symbol("😁", "GRINNING FACE WITH SMILING EYES"),
            Candidate::line("hello"),
        ]
    }

    #[test]
    fn test_resolve_rules() {
        assert!(SelectionResult::resolve(b"x\n", 0).is_selection());
        assert!(SelectionResult::resolve(b"x\n", 2).is_selection());
        assert!(!SelectionResult::resolve(b"", 0).is_selection());
        assert!(!SelectionResult::resolve(b"x\n", CANCEL_CODE).is_selection());
        assert!(!SelectionResult::resolve(b"", CANCEL_CODE).is_selection());
        assert_eq!(SelectionResult::resolve(b"", 5).exit_code, 5);
    }

    #[test]
    fn test_session_picks_last_line() {
        // reads everything before answering, like dmenu
        let chooser = sh("tail -n 1");
        let result =
            ChooserSession::run(ChooserVariant::Dmenu, &chooser, 128, candidates(), " ;").unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("hello\n"));
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn test_chooser_sees_formatted_lines() {
        let chooser = sh("head -n 1");
        let result =
            ChooserSession::run(ChooserVariant::Rofi, &chooser, 128, candidates(), " ;").unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("😀 ;GRINNING FACE\n"));
    }

    #[test]
    fn test_empty_output_is_no_selection() {
        let chooser = sh("cat >/dev/null");
        let result =
            ChooserSession::run(ChooserVariant::Dmenu, &chooser, 128, candidates(), " ;").unwrap();
        assert!(!result.is_selection());
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn test_cancel_code_is_no_selection() {
        let chooser = sh("cat >/dev/null; echo typed; exit 1");
        let result =
            ChooserSession::run(ChooserVariant::Dmenu, &chooser, 128, candidates(), " ;").unwrap();
        assert!(!result.is_selection());
        assert_eq!(result.exit_code, CANCEL_CODE);
    }

    #[test]
    fn test_unusual_exit_still_selects() {
        let chooser = sh("cat >/dev/null; echo picked; exit 3");
        let result =
            ChooserSession::run(ChooserVariant::Dmenu, &chooser, 128, candidates(), " ;").unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("picked\n"));
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn test_only_first_line_is_kept() {
        let chooser = sh("cat >/dev/null; printf 'one\\ntwo\\n'");
        let result =
            ChooserSession::run(ChooserVariant::Dmenu, &chooser, 128, candidates(), " ;").unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("one\n"));
    }

    #[test]
    fn test_background_process_holding_output_does_not_stall() {
        // the backgrounded sleep keeps the chooser's stdout open
        let chooser = sh("cat >/dev/null; echo pick; sleep 4 &");
        let started = std::time::Instant::now();
        let result =
            ChooserSession::run(ChooserVariant::Dmenu, &chooser, 128, candidates(), " ;").unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("pick\n"));
        assert!(started.elapsed() < std::time::Duration::from_secs(3));
    }

    #[test]
    fn test_read_is_bounded() {
        let chooser = sh("cat >/dev/null; printf 'abcdefghij\\n'");
        let result =
            ChooserSession::run(ChooserVariant::Dmenu, &chooser, 4, candidates(), " ;").unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("abcd"));
    }

    #[test]
    fn test_bound_does_not_split_characters() {
        // 😀 is four bytes; a bound of 6 would cut the second one
        let chooser = sh("cat >/dev/null; printf '😀😀\\n'");
        let result =
            ChooserSession::run(ChooserVariant::Dmenu, &chooser, 6, candidates(), " ;").unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("😀"));
    }

    #[test]
    fn test_large_stream_does_not_deadlock() {
        let many = (0..20_000).map(|i| Candidate::symbol(format!("p{i}"), "description"));
        let chooser = sh("wc -l");
        let result = ChooserSession::run(ChooserVariant::Dmenu, &chooser, 128, many, " ;").unwrap();
        assert_eq!(result.raw_line.as_deref().map(str::trim), Some("20000"));
    }

    #[test]
    fn test_chooser_exiting_early_is_tolerated() {
        let many = (0..100_000).map(|i| Candidate::symbol(format!("p{i}"), "description"));
        let chooser = sh("exec 0<&-; echo early");
        let result = ChooserSession::run(ChooserVariant::Dmenu, &chooser, 128, many, " ;").unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("early\n"));
    }

    #[test]
    fn test_state_machine_order() {
        let mut session = ChooserSession::spawn(ChooserVariant::Dmenu, &sh("cat"), 128).unwrap();
        assert_eq!(session.state(), SessionState::Created);

        assert!(matches!(session.wait(), Err(ChooserError::State { .. })));
        assert!(matches!(session.read_output(), Err(ChooserError::State { .. })));

        session.send(candidates(), " ;").unwrap();
        session.send(vec![Candidate::line("more")], " ;").unwrap();
        assert_eq!(session.state(), SessionState::InputSent);
        assert_eq!(session.sent(), 4);

        session.close_input().unwrap();
        assert_eq!(session.state(), SessionState::InputClosed);
        assert!(session.send(candidates(), " ;").is_err());
        assert!(session.close_input().is_err());

        assert_eq!(session.wait().unwrap(), 0);
        assert_eq!(session.state(), SessionState::Waited);

        assert!(session.read_output().unwrap() > 0);
        assert_eq!(session.state(), SessionState::OutputRead);

        let result = session.finish().unwrap();
        assert_eq!(result.raw_line.as_deref(), Some("😀 ;GRINNING FACE\n"));
    }

    #[test]
    fn test_missing_chooser() {
        let command = CommandSpec::new("dmoji-missing-chooser", &[]);
        let err = ChooserSession::spawn(ChooserVariant::Dmenu, &command, 128)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ChooserError::Process(ProcessError::NotFound { .. })
        ));
    }

    #[test]
    fn test_variant_defaults() {
        assert_eq!(ChooserVariant::default(), ChooserVariant::Dmenu);
        assert_eq!(ChooserVariant::Dmenu.default_command(), "dmenu -i");
        assert_eq!(ChooserVariant::Rofi.default_command(), "rofi -dmenu -i");
        assert_eq!(ChooserVariant::Rofi.name(), "rofi");
    }
}
