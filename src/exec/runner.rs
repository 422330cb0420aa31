use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;

use crate::exec::{DEFAULT_TIMEOUT, ExecError, ExecResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Which streams of the child are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// stdout and stderr share one pipe, interleaved as written.
    Merged,
    /// stdout only; stderr is discarded.
    StdoutOnly,
}

/// What a finished shell invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub output: String,
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
}

/// Runs an already-approved command line through a shell.
///
/// Implementations must not validate or rewrite `command_line`; the gateway
/// has done that before calling.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command_line: &str, capture: Capture) -> ExecResult<RawOutput>;
}

/// Runs commands via `<shell> -c <command>` with a bounded wait.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
    timeout: Duration,
}

impl ShellRunner {
    pub fn new<P: AsRef<Path>>(shell: P, timeout: Duration) -> Self {
        Self {
            shell: shell.as_ref().to_path_buf(),
            timeout,
        }
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("/bin/sh", DEFAULT_TIMEOUT)
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command_line: &str, capture: Capture) -> ExecResult<RawOutput> {
        let (mut reader, writer) = io::pipe()?;

        let mut cmd = Command::new(&self.shell);
        // The shell leads its own process group so a timeout reaches
        // everything it forked, not just the shell itself.
        cmd.arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .process_group(0);
        match capture {
            Capture::Merged => {
                cmd.stdout(writer.try_clone()?).stderr(writer);
            }
            Capture::StdoutOnly => {
                cmd.stdout(writer).stderr(Stdio::null());
            }
        }

        let mut child = cmd.spawn().map_err(ExecError::Spawn)?;
        // The write ends now live only in the child.
        drop(cmd);

        let collector = thread::spawn(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| buf)
        });

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() >= self.timeout => {
                    terminate_group(&mut child);
                    tracing::error!(
                        command = command_line,
                        timeout_secs = self.timeout.as_secs(),
                        "command timed out and was killed"
                    );
                    // A process that left the group may still hold the pipe,
                    // so the collector is left to finish on its own.
                    return Err(ExecError::Timeout {
                        command: command_line.to_string(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    terminate_group(&mut child);
                    return Err(err.into());
                }
            }
        };

        let bytes = collector
            .join()
            .map_err(|_| io::Error::other("output collector panicked"))??;

        Ok(RawOutput {
            output: String::from_utf8_lossy(&bytes).into_owned(),
            exit_code: status.code(),
        })
    }
}

/// SIGKILL the child's process group, then reap the child.
fn terminate_group(child: &mut Child) {
    let Ok(raw_pid) = i32::try_from(child.id()) else {
        let _ = child.kill();
        let _ = child.wait();
        return;
    };

    if let Err(err) = killpg(Pid::from_raw(raw_pid), Signal::SIGKILL) {
        tracing::warn!(pid = raw_pid, error = %err, "failed to kill process group");
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ShellRunner {
        ShellRunner::new("/bin/sh", Duration::from_secs(10))
    }

    #[test]
    fn test_run_captures_stdout() {
        let out = runner().run("echo hello", Capture::Merged).unwrap();
        assert_eq!(out.output, "hello\n");
        assert_eq!(out.exit_code, Some(0));
    }

    #[test]
    fn test_merged_capture_includes_stderr() {
        let out = runner()
            .run("echo out; echo err 1>&2", Capture::Merged)
            .unwrap();
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[test]
    fn test_stdout_only_discards_stderr() {
        let out = runner()
            .run("echo out; echo err 1>&2", Capture::StdoutOnly)
            .unwrap();
        assert_eq!(out.output, "out\n");
    }

    #[test]
    fn test_non_zero_exit_is_not_an_error() {
        let out = runner().run("exit 3", Capture::Merged).unwrap();
        assert_eq!(out.exit_code, Some(3));
    }

    #[test]
    fn test_timeout_kills_child() {
        let runner = ShellRunner::new("/bin/sh", Duration::from_millis(200));
        let start = Instant::now();
        let err = runner.run("exec sleep 5", Capture::Merged).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_kills_forked_workload() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let marker = temp_dir.path().join("survived");
        let runner = ShellRunner::new("/bin/sh", Duration::from_millis(300));

        // Compound command: the shell forks `sleep` instead of exec'ing it
        let cmd = format!("cd /tmp && sleep 1 && touch '{}'", marker.display());
        let err = runner.run(&cmd, Capture::Merged).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "workload kept running after the timeout");
    }

    #[test]
    fn test_missing_shell_is_spawn_error() {
        let runner = ShellRunner::new("/nonexistent/shell", Duration::from_secs(1));
        let err = runner.run("echo hi", Capture::Merged).unwrap_err();
        assert!(matches!(err, ExecError::Spawn(_)));
    }

    #[test]
    fn test_default_runner() {
        let runner = ShellRunner::default();
        assert_eq!(runner.shell(), Path::new("/bin/sh"));
        assert_eq!(runner.timeout(), DEFAULT_TIMEOUT);
    }
}
