pub mod audit;
pub mod composer;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod security;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use exec::{CommandOutput, ExecError, ExecutionGateway};
pub use security::{CommandValidator, ParsedCommand, Policy, SecurityError, ViolationKind, validate};
