use std::{io::ErrorKind, process::Command};

use crate::domain::traits::{CommandSpec, ProcessError, ProcessRunner};

/// Spawns real OS processes with inherited stdio and waits for them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        tracing::debug!("Spawning: {}", command);

        let status = Command::new(command.program())
            .args(&command.args)
            .status()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ProcessError::NotFound {
                    program: command.program().display().to_string(),
                },
                _ => ProcessError::Launch { command: command.to_string(), source: e },
            })?;

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(ProcessError::ExitStatus { command: command.to_string(), code }),
            None => Err(ProcessError::Terminated { command: command.to_string() }),
        }
    }
}
