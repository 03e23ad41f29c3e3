//! Scripted process runner for testing.
//!
//! `ScriptedRunner` implements [`ProcessRunner`] without spawning anything.
//! Responses are keyed by the full command line; every invocation is
//! recorded for later assertion.
//!
//! # Example
//!
//! ```
//! use devtopo::shell::{ProcessRunner, ScriptedRunner};
//! use std::time::Duration;
//!
//! let runner = ScriptedRunner::new();
//! runner.respond("brew list --cask", "firefox\niterm2\n");
//!
//! let result = runner.run("brew", &["list", "--cask"], Duration::from_secs(1)).unwrap();
//! assert!(result.stdout.contains("iterm2"));
//! assert_eq!(runner.invocations(), vec!["brew list --cask".to_string()]);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{DevtopoError, Result};

use super::command::{display_command, CommandResult, ProcessRunner};

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandResult),
    Missing,
}

/// Process runner that replays canned responses.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, Scripted>>,
    invocations: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `stdout` for this command line.
    pub fn respond(&self, command: &str, stdout: &str) {
        self.insert(
            command,
            Scripted::Output(CommandResult::success(
                stdout.to_string(),
                String::new(),
                Duration::ZERO,
            )),
        );
    }

    /// Exit with `code` and `stderr` for this command line.
    pub fn fail(&self, command: &str, code: i32, stderr: &str) {
        self.insert(
            command,
            Scripted::Output(CommandResult::failure(
                Some(code),
                String::new(),
                stderr.to_string(),
                Duration::ZERO,
            )),
        );
    }

    /// Exit with `code` but still print `stdout` (e.g. `npm outdated`).
    pub fn respond_with_code(&self, command: &str, code: i32, stdout: &str) {
        self.insert(
            command,
            Scripted::Output(CommandResult::failure(
                Some(code),
                stdout.to_string(),
                String::new(),
                Duration::ZERO,
            )),
        );
    }

    /// Behave as if the program is not installed.
    pub fn missing(&self, command: &str) {
        self.insert(command, Scripted::Missing);
    }

    /// Every command line run so far, in order.
    pub fn invocations(&self) -> Vec<String> {
        lock(&self.invocations).clone()
    }

    /// How many times this exact command line was run.
    pub fn count(&self, command: &str) -> usize {
        lock(&self.invocations)
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    fn insert(&self, command: &str, scripted: Scripted) {
        lock(&self.responses).insert(command.to_string(), scripted);
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str], _timeout: Duration) -> Result<CommandResult> {
        let command = display_command(program, args);
        lock(&self.invocations).push(command.clone());

        match lock(&self.responses).get(&command).cloned() {
            Some(Scripted::Output(result)) => Ok(result),
            Some(Scripted::Missing) | None => Err(DevtopoError::CommandFailed {
                command,
                code: None,
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
