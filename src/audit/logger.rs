use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::security::SecurityError;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Append-only record of every command the gateway approved or refused.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    /// Create a new AuditLogger with the default log path
    pub fn new() -> std::io::Result<Self> {
        Self::with_path(Self::default_log_path()?)
    }

    /// Create an AuditLogger with a custom log path
    pub fn with_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();

        // Ensure directory exists
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { log_path })
    }

    /// Get the default log path: ~/.config/cmdguard/audit.log
    pub fn default_log_path() -> std::io::Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            )
        })?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("cmdguard")
            .join("audit.log"))
    }

    /// Log a command that was approved and ran to completion
    ///
    /// `exit_code` is `None` when the process was ended by a signal.
    pub fn log_execution(
        &self,
        command: &str,
        working_dir: &Path,
        exit_code: Option<i32>,
    ) -> std::io::Result<()> {
        let status = match exit_code {
            Some(code) => format!("exit:{}", code),
            None => "exit:signal".to_string(),
        };
        self.append(working_dir, &format!("[{}] {}", status, command))
    }

    /// Log an approved command that was killed for exceeding its time bound
    pub fn log_timeout(&self, command: &str, working_dir: &Path) -> std::io::Result<()> {
        self.append(working_dir, &format!("[TIMEOUT] {}", command))
    }

    /// Log a command refused before any process was spawned
    ///
    /// Rejections are kept for forensics: repeated refusals of the same shape
    /// usually point at a caller building commands from untrusted input.
    pub fn log_rejection(
        &self,
        command: &str,
        error: &SecurityError,
        working_dir: &Path,
    ) -> std::io::Result<()> {
        self.append(
            working_dir,
            &format!(
                "[REJECTED:{}] command=\"{}\" reason=\"{}\"",
                error.kind().as_str(),
                command.escape_debug(),
                error
            ),
        )
    }

    fn append(&self, working_dir: &Path, entry: &str) -> std::io::Result<()> {
        // Check and rotate log if needed
        self.rotate_if_needed()?;

        let timestamp = Utc::now().to_rfc3339();
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());

        let log_entry = format!(
            "[{}] [{}] [{}] {}\n",
            timestamp,
            user,
            working_dir.display(),
            entry
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(log_entry.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Rotate log file if it exceeds MAX_LOG_SIZE
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(&self.log_path)?;
        if metadata.len() > MAX_LOG_SIZE {
            // Rotate: audit.log -> audit.log.1
            let backup_path = self.log_path.with_extension("log.1");
            fs::rename(&self.log_path, backup_path)?;
        }

        Ok(())
    }

    /// Get the path to the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
