//! The command-execution collaborator.
//!
//! cpuparity never owns a transport.  Whatever reaches the guest (SSH, a
//! serial console, a vsock agent) or runs on the host implements
//! [`GuestSession`]: run one command, block until it finishes, return its
//! exit code and captured output.  Retries and timeouts are the
//! implementor's business; failures surface here unmodified.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Failures of the collaborator itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The command could not be delivered or its result not collected.
    #[error("transport failure running `{command}`: {message}")]
    Transport { command: String, message: String },

    /// The command ran but exited non-zero where success was required.
    #[error("`{command}` exited with status {exit_code}\n  stdout: {stdout}\n  stderr: {stderr}")]
    NonZeroExit {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

/// Something that can run a shell command in a host or guest context.
pub trait GuestSession {
    /// Run `command` and return its result whatever the exit status.
    fn run(&mut self, command: &str) -> Result<CommandOutput, SessionError>;

    /// Run `command` and require a zero exit status.
    fn check_output(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        let output = self.run(command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(SessionError::NonZeroExit {
                command: command.to_string(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }
}

impl<S: GuestSession + ?Sized> GuestSession for &mut S {
    fn run(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        (**self).run(command)
    }

    fn check_output(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        (**self).check_output(command)
    }
}
