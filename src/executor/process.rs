//! Process-backed command runner.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use super::{CommandRunner, ExecutionError, ExecutionResult};

/// Runs each command line as a program path with no arguments.
///
/// The command line is not split or passed through a shell, so
/// `"/usr/bin/deploy --prod"` names a program called `deploy --prod`. Stdin is
/// closed, stdout is captured for the result, and stderr is captured for the
/// error message on a non-zero exit.
///
/// The caller awaits the whole run. A webhook request therefore stays open
/// until its commands finish; configure a timeout if commands can hang.
///
/// On Unix each command runs in its own process group, and a timeout kills
/// the whole group, so processes the command started do not outlive it. A
/// descendant that moves itself to another group or session escapes this.
/// Elsewhere only the direct child is killed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, command_line: &str, timeout: Option<Duration>) -> ExecutionResult {
        let start = Instant::now();

        if command_line.is_empty() {
            return ExecutionResult::failed(
                command_line,
                Vec::new(),
                ExecutionError::EmptyCommand,
                start.elapsed(),
            );
        }

        let mut command = Command::new(command_line);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out child dies with the dropped future.
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::failed(
                    command_line,
                    Vec::new(),
                    ExecutionError::Spawn(e),
                    start.elapsed(),
                );
            }
        };

        let pid = child.id();
        debug!(command = %command_line, pid = ?pid, "Spawned command");

        let wait = child.wait_with_output();
        tokio::pin!(wait);

        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut wait).await {
                Ok(waited) => waited,
                Err(_) => {
                    // Kill the group while the leader is still unreaped.
                    kill_process_group(pid);
                    return ExecutionResult::failed(
                        command_line,
                        Vec::new(),
                        ExecutionError::TimedOut { after: limit },
                        start.elapsed(),
                    );
                }
            },
            None => wait.await,
        };

        let output = match waited {
            Ok(output) => output,
            Err(e) => {
                return ExecutionResult::failed(
                    command_line,
                    Vec::new(),
                    ExecutionError::Wait(e),
                    start.elapsed(),
                );
            }
        };

        let duration = start.elapsed();
        if output.status.success() {
            ExecutionResult::succeeded(command_line, output.stdout, duration)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            ExecutionResult::failed(
                command_line,
                output.stdout,
                ExecutionError::Exit {
                    code: output.status.code(),
                    stderr,
                },
                duration,
            )
        }
    }
}

/// Sends SIGKILL to the process group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    // The child was spawned with `process_group(0)`, so its pgid is its pid.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            pid,
            error = %std::io::Error::last_os_error(),
            "Failed to kill process group"
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
