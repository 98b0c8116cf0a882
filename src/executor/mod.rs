//! Command execution.
//!
//! A [`CommandRunner`] runs one configured command line and reports what
//! happened. It never returns an error: every failure is folded into the
//! [`ExecutionResult`] so that dispatch can log it and move on to the next
//! command.
//!
//! The trait exists so dispatch can be tested without spawning processes;
//! production uses [`ProcessRunner`].

pub mod process;

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;

pub use process::ProcessRunner;

/// Why a command did not complete successfully.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The configured command line is empty.
    #[error("empty command line")]
    EmptyCommand,

    /// The process could not be started (e.g. the executable does not exist).
    #[error("failed to start: {0}")]
    Spawn(#[source] io::Error),

    /// Waiting for the process or reading its output failed.
    #[error("failed while waiting for process: {0}")]
    Wait(#[source] io::Error),

    /// The process exited unsuccessfully. `code` is `None` when it was
    /// terminated by a signal.
    #[error("exited with {}: {stderr}", exit_code_display(.code))]
    Exit { code: Option<i32>, stderr: String },

    /// The process ran past the configured timeout and was killed.
    #[error("timed out after {}s", .after.as_secs())]
    TimedOut { after: Duration },
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "signal".to_string(),
    }
}

/// The outcome of running one command.
#[derive(Debug)]
pub struct ExecutionResult {
    /// The command line as configured.
    pub command: String,

    /// True if the process started and exited with status 0.
    pub success: bool,

    /// Captured standard output. Empty if the process never started.
    pub output: Vec<u8>,

    /// Set whenever `success` is false.
    pub error: Option<ExecutionError>,

    /// Wall-clock time from spawn to exit (or failure).
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn succeeded(command: impl Into<String>, output: Vec<u8>, duration: Duration) -> Self {
        ExecutionResult {
            command: command.into(),
            success: true,
            output,
            error: None,
            duration,
        }
    }

    pub fn failed(
        command: impl Into<String>,
        output: Vec<u8>,
        error: ExecutionError,
        duration: Duration,
    ) -> Self {
        ExecutionResult {
            command: command.into(),
            success: false,
            output,
            error: Some(error),
            duration,
        }
    }

    /// Returns stdout as text, replacing invalid UTF-8.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Runs configured command lines.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct AlwaysOk;
///
/// impl CommandRunner for AlwaysOk {
///     async fn run(&self, command_line: &str, _timeout: Option<Duration>) -> ExecutionResult {
///         ExecutionResult::succeeded(command_line, Vec::new(), Duration::ZERO)
///     }
/// }
/// ```
pub trait CommandRunner {
    /// Runs `command_line` to completion, killing it after `timeout` if one
    /// is given.
    fn run(
        &self,
        command_line: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = ExecutionResult> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_carries_error() {
        let result = ExecutionResult::failed(
            "/bin/deploy",
            Vec::new(),
            ExecutionError::EmptyCommand,
            Duration::ZERO,
        );
        assert!(!result.success);
        assert!(matches!(result.error, Some(ExecutionError::EmptyCommand)));
    }

    #[test]
    fn exit_error_message() {
        let err = ExecutionError::Exit {
            code: Some(2),
            stderr: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "exited with status 2: boom");

        let err = ExecutionError::Exit {
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "exited with signal: ");
    }

    #[test]
    fn output_lossy_replaces_invalid_utf8() {
        let result =
            ExecutionResult::succeeded("/bin/x", vec![b'o', b'k', 0xff], Duration::ZERO);
        assert_eq!(result.output_lossy(), "ok\u{fffd}");
    }
}
