//! Webhook-to-command dispatch.
//!
//! Given a decoded [`PipelineEvent`] and a configuration snapshot, dispatch:
//!
//! 1. selects every repository rule whose name equals the event's project
//!    (any number may match),
//! 2. walks each matched rule's commands in configured order,
//! 3. runs a command once if any build in its stage succeeded, however many
//!    builds in that stage succeeded,
//! 4. reports [`DispatchOutcome::NothingToExecute`] when no command ran.
//!
//! # Ordering and isolation
//!
//! Commands of one dispatch run one after another in configured order. A
//! failed command is logged and the next one still runs.
//!
//! # Concurrency
//!
//! Dispatches for separate requests are independent and are not serialized,
//! even for the same project and stage. Two pipelines finishing close
//! together can run the same command concurrently; commands that are not
//! idempotent need their own locking.


use tracing::{info, instrument, warn};

use crate::config::{CommandRule, Configuration};
use crate::executor::{CommandRunner, ExecutionResult};
use crate::webhooks::PipelineEvent;

/// What a dispatch did.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// No command was triggered. `matched_rules` is the number of repository
    /// rules that matched the project (zero for an unconfigured project).
    NothingToExecute { matched_rules: usize },

    /// At least one command ran; results are in execution order.
    Executed(Vec<ExecutionResult>),
}

impl DispatchOutcome {
    /// Returns the results of the commands that ran (empty if none did).
    pub fn executions(&self) -> &[ExecutionResult] {
        match self {
            DispatchOutcome::NothingToExecute { .. } => &[],
            DispatchOutcome::Executed(results) => results,
        }
    }

    pub fn is_nothing_to_execute(&self) -> bool {
        matches!(self, DispatchOutcome::NothingToExecute { .. })
    }

    /// Number of commands that ran and failed.
    pub fn failures(&self) -> usize {
        self.executions().iter().filter(|r| !r.success).count()
    }
}

/// Returns the commands `event` triggers under `config`, in execution order.
///
/// Each command rule appears at most once. Nothing is run.
pub fn plan<'a>(event: &PipelineEvent, config: &'a Configuration) -> Vec<&'a CommandRule> {
    config
        .rules_for(&event.project)
        .flat_map(|rule| rule.commands.iter())
        .filter(|command| event.stage_succeeded(&command.stage))
        .collect()
}

/// Runs every command `event` triggers under `config`.
///
/// Never fails: an unconfigured project or an event with no successful
/// matching stage yields [`DispatchOutcome::NothingToExecute`], and command
/// failures are recorded in their [`ExecutionResult`].
#[instrument(skip_all, fields(project = %event.project, commit = event.commit_id.as_deref().unwrap_or("-")))]
pub async fn dispatch<R: CommandRunner>(
    event: &PipelineEvent,
    config: &Configuration,
    runner: &R,
) -> DispatchOutcome {
    let matched_rules = config.rules_for(&event.project).count();
    if matched_rules == 0 {
        info!("No repository rule for project; nothing to execute");
        return DispatchOutcome::NothingToExecute { matched_rules };
    }

    let triggered = plan(event, config);
    if triggered.is_empty() {
        info!(
            matched_rules,
            builds = event.builds.len(),
            "No successful stage matches a configured command; nothing to execute"
        );
        return DispatchOutcome::NothingToExecute { matched_rules };
    }

    let timeout = config.command_timeout();
    let mut results = Vec::with_capacity(triggered.len());

    for command in triggered {
        info!(stage = %command.stage, command = %command.cmd, "Executing command");
        let result = runner.run(&command.cmd, timeout).await;
        log_result(command, &result);
        results.push(result);
    }

    DispatchOutcome::Executed(results)
}

fn log_result(command: &CommandRule, result: &ExecutionResult) {
    match &result.error {
        None => info!(
            stage = %command.stage,
            command = %command.cmd,
            duration_ms = result.duration.as_millis() as u64,
            output = %result.output_lossy(),
            "Executed command"
        ),
        Some(error) => warn!(
            stage = %command.stage,
            command = %command.cmd,
            duration_ms = result.duration.as_millis() as u64,
            output = %result.output_lossy(),
            error = %error,
            "Command failed"
        ),
    }
}
