//! Composer invocations built on top of the execution gateway.
//!
//! Every helper assembles a command string and hands it to
//! [`ExecutionGateway`]; nothing here talks to the OS directly, so a package
//! name or directory carrying shell metacharacters is refused by the
//! validator before any process exists.

use std::path::{Path, PathBuf};

use crate::exec::{CommandOutput, ExecResult, ExecutionGateway};
use crate::security::validator::quote_arg;

/// Names probed, in order, when looking for composer on `PATH`.
const COMPOSER_CANDIDATES: &[&str] = &["composer", "composer.phar"];

/// Locate composer on `PATH`, returning the first candidate `which` resolves.
pub fn find_composer(gateway: &ExecutionGateway) -> ExecResult<Option<PathBuf>> {
    for candidate in COMPOSER_CANDIDATES {
        if let Some(path) = gateway.query(&format!("which {}", candidate))? {
            tracing::debug!(candidate, path = %path, "composer located");
            return Ok(Some(PathBuf::from(path)));
        }
    }
    Ok(None)
}

/// `cd <dir> && composer require <package> --no-interaction`
pub fn require_command(dir: &Path, package: &str) -> String {
    format!(
        "cd {} && composer require {} --no-interaction",
        quote_arg(&dir.to_string_lossy()),
        quote_arg(package)
    )
}

/// `cd <dir> && composer dump-autoload --no-interaction`
pub fn dump_autoload_command(dir: &Path) -> String {
    format!(
        "cd {} && composer dump-autoload --no-interaction",
        quote_arg(&dir.to_string_lossy())
    )
}

/// Install `package` into the project at `dir`.
pub fn require_package(
    gateway: &ExecutionGateway,
    dir: &Path,
    package: &str,
) -> ExecResult<CommandOutput> {
    gateway.run(&require_command(dir, package))
}

/// Regenerate the autoloader of the project at `dir`.
pub fn dump_autoload(gateway: &ExecutionGateway, dir: &Path) -> ExecResult<CommandOutput> {
    gateway.run(&dump_autoload_command(dir))
}
