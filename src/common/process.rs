//! Piped child processes
//!
//! `spawn_piped` starts a helper with both standard streams redirected to
//! pipes owned by the caller. The child side of each pipe is closed in the
//! parent as soon as the child exists, and `std` marks every parent-side fd
//! close-on-exec, so the child never holds the write end of its own stdin.
//! Closing [`PipeChannel::close_input`] is therefore enough for the child to
//! see EOF.

use std::io::{self, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use thiserror::Error;

use crate::common::shell::command_line;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` is not installed or not in PATH")]
    NotFound { program: String },

    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("input of `{program}` is already closed")]
    InputClosed { program: String },

    #[error("output of `{program}` is already closed")]
    OutputClosed { program: String },

    #[error("I/O error talking to `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Exit status reduced to a single integer.
///
/// A child killed by a signal reports `128 + signal` like a shell does.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// The parent's ends of a piped child.
///
/// Each end is closed at most once: either explicitly through
/// `close_input` / `close_output`, or when the channel is dropped.
#[derive(Debug)]
pub struct PipeChannel {
    program: String,
    input: Option<ChildStdin>,
    output: Option<ChildStdout>,
    child: Child,
}

/// Spawn `program` with stdin and stdout connected to fresh pipes.
///
/// `program` is resolved through `PATH`. Exec failures, including a missing
/// executable, are reported by `spawn` itself and come back as an error.
pub fn spawn_piped(program: &str, args: &[String]) -> Result<PipeChannel, ProcessError> {
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::piped()).stdout(Stdio::piped());

    crate::ui::debug(
        "process.spawn",
        &format!("spawning {}", command_line(program, args)),
    );

    let mut child = cmd.spawn().map_err(|source| spawn_error(program, args, source))?;

    let input = child.stdin.take();
    let output = child.stdout.take();

    Ok(PipeChannel {
        program: program.to_string(),
        input,
        output,
        child,
    })
}

/// Spawn `program` with inherited standard streams and wait for it.
pub fn run_to_completion(program: &str, args: &[String]) -> Result<ExitStatus, ProcessError> {
    crate::ui::debug(
        "process.spawn",
        &format!("running {}", command_line(program, args)),
    );

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .spawn()
        .map_err(|source| spawn_error(program, args, source))?;

    child.wait().map_err(|source| ProcessError::Wait {
        program: program.to_string(),
        source,
    })
}

fn spawn_error(program: &str, args: &[String], source: io::Error) -> ProcessError {
    if source.kind() == io::ErrorKind::NotFound && which::which(program).is_err() {
        return ProcessError::NotFound {
            program: program.to_string(),
        };
    }
    ProcessError::Spawn {
        command: command_line(program, args),
        source,
    }
}

impl PipeChannel {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Write raw bytes to the child's stdin.
    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.input.as_mut() {
            Some(stdin) => stdin.write_all(bytes),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("input of `{}` is closed", self.program),
            )),
        }
    }

    /// Borrow the child's stdin as a writer.
    pub fn input(&mut self) -> Result<&mut ChildStdin, ProcessError> {
        self.input.as_mut().ok_or_else(|| ProcessError::InputClosed {
            program: self.program.clone(),
        })
    }

    /// Close the child's stdin. This is the child's only end-of-input signal.
    pub fn close_input(&mut self) -> Result<(), ProcessError> {
        match self.input.take() {
            Some(stdin) => {
                drop(stdin);
                Ok(())
            }
            None => Err(ProcessError::InputClosed {
                program: self.program.clone(),
            }),
        }
    }

    /// Close the child's stdout without reading it.
    pub fn close_output(&mut self) -> Result<(), ProcessError> {
        match self.output.take() {
            Some(stdout) => {
                drop(stdout);
                Ok(())
            }
            None => Err(ProcessError::OutputClosed {
                program: self.program.clone(),
            }),
        }
    }

    /// Block until the child exits.
    ///
    /// Consumes the channel so the child is reaped exactly once. A still-open
    /// input is closed first, otherwise a child reading to EOF would never
    /// exit. The read end, if not taken, is returned for the caller to drain.
    pub fn wait(mut self) -> Result<(ExitStatus, Option<ChildStdout>), ProcessError> {
        if self.input.is_some() {
            self.close_input()?;
        }
        let status = self.child.wait().map_err(|source| ProcessError::Wait {
            program: self.program.clone(),
            source,
        })?;
        crate::ui::debug(
            "process.exit",
            &format!("{} exited with {}", self.program, exit_code(status)),
        );
        Ok((status, self.output.take()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_echo_through_pipes() {
        let mut channel = spawn_piped("sh", &sh("cat")).unwrap();
        channel.write_all(b"hello\nworld\n").unwrap();
        channel.close_input().unwrap();

        let (status, output) = channel.wait().unwrap();
        assert!(status.success());

        let mut text = String::new();
        output.unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello\nworld\n");
    }

    #[test]
    fn test_child_sees_eof_after_close() {
        // wc only prints once its stdin reaches EOF
        let mut channel = spawn_piped("sh", &sh("wc -l")).unwrap();
        for _ in 0..3 {
            channel.write_all(b"line\n").unwrap();
        }
        channel.close_input().unwrap();

        let (status, output) = channel.wait().unwrap();
        assert!(status.success());
        let mut text = String::new();
        output.unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text.trim(), "3");
    }

    #[test]
    fn test_close_input_twice_is_error() {
        let mut channel = spawn_piped("sh", &sh("cat >/dev/null")).unwrap();
        channel.close_input().unwrap();
        assert!(matches!(
            channel.close_input(),
            Err(ProcessError::InputClosed { .. })
        ));
        channel.wait().unwrap();
    }

    #[test]
    fn test_wait_closes_open_input() {
        let channel = spawn_piped("sh", &sh("cat >/dev/null")).unwrap();
        let (status, _) = channel.wait().unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_missing_program() {
        let err = spawn_piped("dmoji-no-such-program", &[]).unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }

    #[test]
    fn test_exit_code_passthrough() {
        let status = run_to_completion("sh", &sh("exit 7")).unwrap();
        assert_eq!(exit_code(status), 7);
    }

    #[test]
    fn test_exit_code_for_signal() {
        let status = run_to_completion("sh", &sh("kill -9 $$")).unwrap();
        assert_eq!(exit_code(status), 137);
    }

    #[test]
    fn test_write_after_close_is_broken_pipe() {
        let mut channel = spawn_piped("sh", &sh("cat >/dev/null")).unwrap();
        channel.close_input().unwrap();
        let err = channel.write_all(b"late").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        channel.wait().unwrap();
    }
}
