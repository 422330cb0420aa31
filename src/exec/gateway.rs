use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::audit::AuditLogger;
use crate::config::Config;
use crate::exec::{Capture, CommandRunner, ExecError, ExecResult, RawOutput, ShellRunner};
use crate::security::{ParsedCommand, Policy, validate};

/// Result of running an approved command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// stdout and stderr lines, interleaved as the process wrote them
    pub lines: Vec<String>,
    /// `-1` when the process was ended by a signal
    pub exit_code: i32,
    pub success: bool,
}

/// The only path from a caller-built command string to the operating system.
///
/// Every command is validated first; a refused command never reaches the
/// runner, and an approved one reaches it exactly once in its normalized form.
pub struct ExecutionGateway {
    runner: Box<dyn CommandRunner>,
    process_policy: &'static Policy,
    query_policy: &'static Policy,
    audit: Option<AuditLogger>,
}

impl ExecutionGateway {
    /// Gateway running commands through `/bin/sh` with the default timeout
    pub fn new() -> Self {
        Self::with_runner(Box::new(ShellRunner::default()))
    }

    /// Gateway running commands through `/bin/sh`, killing them after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_runner(Box::new(ShellRunner::new("/bin/sh", timeout)))
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            process_policy: Policy::process_execution(),
            query_policy: Policy::shell_query(),
            audit: None,
        }
    }

    /// Gateway using the shell, timeout and audit settings from `config`
    pub fn from_config(config: &Config) -> std::io::Result<Self> {
        let runner = ShellRunner::new(&config.execution.shell, config.timeout());
        let gateway = Self::with_runner(Box::new(runner));

        if !config.audit.enabled {
            return Ok(gateway);
        }

        let logger = match &config.audit.log_path {
            Some(path) => AuditLogger::with_path(path)?,
            None => AuditLogger::new()?,
        };
        Ok(gateway.with_audit(logger))
    }

    /// Record approvals, rejections and timeouts in `logger`
    pub fn with_audit(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    pub fn audit(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    /// Validate `raw` against the process-execution policy and run it.
    ///
    /// A non-zero exit code is returned as a normal [`CommandOutput`]; only a
    /// refused command, a spawn failure or a timeout is an error.
    pub fn run(&self, raw: &str) -> ExecResult<CommandOutput> {
        let parsed = self.guard(raw, self.process_policy)?;
        let raw_output = self.execute(&parsed, Capture::Merged)?;

        let exit_code = raw_output.exit_code.unwrap_or(-1);
        tracing::info!(command = raw, exit_code, "command finished");

        Ok(CommandOutput {
            lines: raw_output.output.lines().map(str::to_string).collect(),
            exit_code,
            success: raw_output.exit_code == Some(0),
        })
    }

    /// Validate `raw` against the shell-query policy and capture its stdout.
    ///
    /// Returns `None` when the command printed nothing, e.g. `which` on a
    /// binary missing from `PATH`.
    pub fn query(&self, raw: &str) -> ExecResult<Option<String>> {
        let parsed = self.guard(raw, self.query_policy)?;
        let raw_output = self.execute(&parsed, Capture::StdoutOnly)?;

        let trimmed = raw_output.output.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    fn guard(&self, raw: &str, policy: &Policy) -> ExecResult<ParsedCommand> {
        match validate(raw, policy) {
            Ok(parsed) => {
                tracing::debug!(
                    policy = policy.name(),
                    directory = parsed.directory_change.as_deref(),
                    command = %parsed.remainder,
                    "command approved"
                );
                Ok(parsed)
            }
            Err(err) => {
                tracing::warn!(
                    policy = policy.name(),
                    kind = err.kind().as_str(),
                    command = raw,
                    "command rejected: {}",
                    err
                );
                if let Some(audit) = &self.audit {
                    if let Err(e) = audit.log_rejection(raw, &err, &current_dir()) {
                        tracing::warn!("failed to write audit entry: {}", e);
                    }
                }
                Err(err.into())
            }
        }
    }

    fn execute(&self, parsed: &ParsedCommand, capture: Capture) -> ExecResult<RawOutput> {
        let command_line = parsed.command_line();
        let working_dir = parsed
            .directory_change
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(current_dir);

        let result = self.runner.run(&command_line, capture);

        if let Some(audit) = &self.audit {
            let logged = match &result {
                Ok(output) => audit.log_execution(&command_line, &working_dir, output.exit_code),
                Err(ExecError::Timeout { .. }) => audit.log_timeout(&command_line, &working_dir),
                Err(_) => Ok(()),
            };
            if let Err(e) = logged {
                tracing::warn!("failed to write audit entry: {}", e);
            }
        }

        result
    }
}

impl Default for ExecutionGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
