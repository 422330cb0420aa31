pub mod policy;
pub mod validator;

pub use policy::Policy;
pub use validator::{CommandValidator, ParsedCommand, SecurityError, ViolationKind, validate};

/// Binaries that may start a command run through the process-execution entry point.
///
/// Adding a binary here widens what the installer can spawn and requires
/// careful security review.
pub const PROCESS_EXECUTION_BINARIES: &[&str] = &["composer", "which"];

/// Binaries that may start a read-only shell query.
pub const SHELL_QUERY_BINARIES: &[&str] = &["which"];

/// Characters that are never accepted anywhere in a command.
///
/// The two-character `&&` that joins a recognized `cd <dir> && ...` prefix is
/// the only tolerated occurrence of `&`.
pub const FORBIDDEN_CHARACTERS: &[char] = &[';', '&', '|', '`', '$', '<', '>', '\n', '\r'];

/// Directories that a `cd` prefix may never target.
///
/// `/` only matches itself; every other entry also covers its descendants.
pub const FORBIDDEN_PATH_PREFIXES: &[&str] = &["/etc", "/bin", "/usr", "/root", "/boot", "/"];
