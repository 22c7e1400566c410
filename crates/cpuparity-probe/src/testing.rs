//! Scripted in-memory session used by the unit tests.

use crate::session::{CommandOutput, GuestSession, SessionError};
use std::collections::HashMap;

/// Answers commands from a fixed script and records what was asked.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSession {
    responses: HashMap<String, Result<CommandOutput, SessionError>>,
    history: Vec<String>,
}

impl ScriptedSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, command: &str, exit_code: i32, stdout: &str) -> Self {
        self.respond_full(command, CommandOutput::new(exit_code, stdout, ""))
    }

    pub(crate) fn respond_full(mut self, command: &str, output: CommandOutput) -> Self {
        self.responses.insert(command.to_string(), Ok(output));
        self
    }

    pub(crate) fn fail(mut self, command: &str, message: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            Err(SessionError::Transport {
                command: command.to_string(),
                message: message.to_string(),
            }),
        );
        self
    }

    pub(crate) fn history(&self) -> &[String] {
        &self.history
    }
}

impl GuestSession for ScriptedSession {
    fn run(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        self.history.push(command.to_string());
        self.responses
            .get(command)
            .cloned()
            .unwrap_or_else(|| {
                Err(SessionError::Transport {
                    command: command.to_string(),
                    message: "no scripted response".to_string(),
                })
            })
    }
}
