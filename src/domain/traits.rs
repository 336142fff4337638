// ============================================================
// Layer 3 - Core Traits (Capabilities)
// ============================================================
// Every side effect the application layer needs goes through one
// of these traits, so the menu and the pipeline can be tested
// with in-memory doubles:
//
//   ProcessRunner   -> SystemProcessRunner (std::process)
//   WorkflowTrigger -> HttpWorkflowTrigger (reqwest)
//   ModelRegistry   -> HubRegistry (hf-hub) / LocalRegistry (dir)
//
// The two menu-facing errors are typed so the controller can
// pick a message per variant. Everything else is anyhow.
//
// Reference: Rust Book §10 (Traits), thiserror documentation

use anyhow::Result;
use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;

// ─── ProcessRunner ────────────────────────────────────────────────────────────

/// A program plus its arguments, ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args:    Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("'{program}' not found")]
    NotFound { program: String },

    #[error("Command '{command}' returned non-zero exit status {code}")]
    ExitStatus { command: String, code: i32 },

    #[error("Command '{command}' was terminated by a signal")]
    Terminated { command: String },

    #[error("Cannot launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source:  std::io::Error,
    },
}

/// Runs a command to completion and reports how it ended.
/// Blocks the caller; there is no timeout.
pub trait ProcessRunner {
    fn run(&self, command: &CommandSpec) -> Result<(), ProcessError>;
}

// ─── WorkflowTrigger ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// Kicks off the external workflow. Success means the call completed;
/// no response body is interpreted.
pub trait WorkflowTrigger {
    fn trigger(&self) -> Result<(), TriggerError>;
}

// ─── ModelRegistry ────────────────────────────────────────────────────────────

/// Resolves files of a pretrained model to local paths.
pub trait ModelRegistry {
    /// Returns the local path of `file` for `model_id`, or `None` when
    /// the model does not ship that file.
    fn fetch(&self, model_id: &str, file: &str) -> Result<Option<PathBuf>>;
}

impl<T: ModelRegistry + ?Sized> ModelRegistry for Box<T> {
    fn fetch(&self, model_id: &str, file: &str) -> Result<Option<PathBuf>> {
        (**self).fetch(model_id, file)
    }
}
