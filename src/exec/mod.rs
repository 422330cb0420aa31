pub mod gateway;
pub mod runner;

pub use gateway::{CommandOutput, ExecutionGateway};
pub use runner::{Capture, CommandRunner, RawOutput, ShellRunner};

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::security::SecurityError;

/// Default bound on how long an approved command may run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors that can occur while guarding or running a command
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Failed to spawn shell: {0}")]
    Spawn(#[source] io::Error),

    #[error("Command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ExecError {
    /// The validation failure, if the command never reached the shell for that reason.
    pub fn as_security(&self) -> Option<&SecurityError> {
        match self {
            ExecError::Security(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for gateway operations
pub type ExecResult<T> = std::result::Result<T, ExecError>;
