use std::io;
use thiserror::Error;

// Import module-level errors for AppError
use crate::config::ConfigError;
use crate::exec::ExecError;
use crate::security::SecurityError;

/// Top-level application error that wraps all module-specific errors
///
/// Module errors convert into AppError via `From`, so application code can
/// use `?` while callers still match on the specific failure.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Exec(#[from] ExecError),

    #[error("Security validation error: {0}")]
    Security(#[from] SecurityError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AppError {
    /// The validation failure behind this error, wherever it was raised.
    pub fn security(&self) -> Option<&SecurityError> {
        match self {
            AppError::Security(err) => Some(err),
            AppError::Exec(err) => err.as_security(),
            _ => None,
        }
    }

    /// Process exit code the CLI uses for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            _ if self.security().is_some() => 2,
            AppError::Exec(ExecError::Timeout { .. }) => 124,
            _ => 1,
        }
    }
}

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
