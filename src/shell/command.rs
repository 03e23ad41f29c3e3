//! External command execution.
//!
//! Sources that shell out to a package manager do it through the
//! [`ProcessRunner`] trait so tests can substitute a scripted runner and
//! verify that availability checks never spawn a process.

use crate::error::{DevtopoError, Result};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of executing an external command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }

    /// Convert a non-zero exit into [`DevtopoError::CommandFailed`].
    pub fn ok_or_failed(self, command: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(DevtopoError::CommandFailed {
                command: command.to_string(),
                code: self.exit_code,
            })
        }
    }

    /// First non-empty line of stderr, falling back to stdout.
    ///
    /// Package managers report the useful part of a failure on one line.
    pub fn summary(&self) -> String {
        self.stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("no output")
            .to_string()
    }
}

/// Runs external programs on behalf of sources and remediation actions.
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, killing it once `timeout` elapses.
    ///
    /// A non-zero exit is returned as an unsuccessful [`CommandResult`],
    /// not an error. Errors mean the program could not run to completion.
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<CommandResult>;
}

/// Render a program and its arguments for logs and error messages.
pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs programs directly (argv, no shell) with captured output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<CommandResult> {
        let command = display_command(program, args);
        let start = Instant::now();

        tracing::debug!("Running `{}` (timeout {:?})", command, timeout);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|_| DevtopoError::CommandFailed {
                command: command.clone(),
                code: None,
            })?;

        // Drain pipes on their own threads so a chatty child cannot block
        // on a full pipe while we wait for it.
        let stdout_handle = spawn_reader(child.stdout.take());
        let stderr_handle = spawn_reader(child.stderr.take());

        let status = match wait_with_deadline(&mut child, start + timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!("`{}` killed after {:?}", command, timeout);
                return Err(DevtopoError::CommandTimedOut { command, timeout });
            }
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();
        let duration = start.elapsed();

        if status.success() {
            Ok(CommandResult::success(stdout, stderr, duration))
        } else {
            Ok(CommandResult::failure(status.code(), stdout, stderr, duration))
        }
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> thread::JoinHandle<String>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
) -> Result<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
