//! Shared test utilities and arbitrary generators for property-based testing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;

use crate::config::{CommandRule, Configuration, RepositoryRule};
use crate::executor::{CommandRunner, ExecutionError, ExecutionResult};
use crate::types::{ProjectPath, Stage};
use crate::webhooks::{BuildOutcome, BuildStatus, PipelineEvent};

/// A runner that records every command line instead of spawning it.
///
/// Commands registered with [`RecordingRunner::failing`] report a non-zero
/// exit; everything else succeeds with the command line echoed as output.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<(String, Option<Duration>)>>>,
    failing: Arc<HashSet<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    pub fn failing<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RecordingRunner {
            calls: Arc::default(),
            failing: Arc::new(commands.into_iter().map(Into::into).collect()),
        }
    }

    /// Command lines run so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(cmd, _)| cmd.clone())
            .collect()
    }

    /// Timeouts passed with each run, in order.
    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, command_line: &str, timeout: Option<Duration>) -> ExecutionResult {
        self.calls
            .lock()
            .unwrap()
            .push((command_line.to_string(), timeout));

        if self.failing.contains(command_line) {
            ExecutionResult::failed(
                command_line,
                Vec::new(),
                ExecutionError::Exit {
                    code: Some(1),
                    stderr: "recorded failure".to_string(),
                },
                Duration::ZERO,
            )
        } else {
            ExecutionResult::succeeded(command_line, command_line.as_bytes().to_vec(), Duration::ZERO)
        }
    }
}

/// Builds a repository rule from `(stage, cmd)` pairs.
pub fn rule(project: &str, commands: &[(&str, &str)]) -> RepositoryRule {
    RepositoryRule::new(
        project,
        commands
            .iter()
            .map(|(stage, cmd)| CommandRule::new(*stage, *cmd))
            .collect(),
    )
}

/// Builds a configuration holding `rules` in order.
pub fn config_with(rules: Vec<RepositoryRule>) -> Configuration {
    Configuration {
        port: 8080,
        repositories: rules,
        ..Configuration::default()
    }
}

/// Builds an event from `(stage, status)` pairs.
pub fn event_with(project: &str, builds: &[(&str, &str)]) -> PipelineEvent {
    PipelineEvent::new(
        project,
        builds
            .iter()
            .map(|(stage, status)| BuildOutcome::new(*stage, BuildStatus::parse(status)))
            .collect(),
    )
}

pub fn arb_project() -> impl Strategy<Value = ProjectPath> {
    prop_oneof![Just("team/app"), Just("team/api"), Just("other/repo")]
        .prop_map(ProjectPath::from)
}

pub fn arb_stage() -> impl Strategy<Value = Stage> {
    prop_oneof![Just("build"), Just("test"), Just("deploy")].prop_map(Stage::from)
}

pub fn arb_status() -> impl Strategy<Value = BuildStatus> {
    prop_oneof![
        Just(BuildStatus::Success),
        Just(BuildStatus::Failed),
        Just(BuildStatus::Running),
        Just(BuildStatus::Skipped),
        "[a-z]{1,8}".prop_map(|s| BuildStatus::parse(&s)),
    ]
}

pub fn arb_build_outcome() -> impl Strategy<Value = BuildOutcome> {
    (arb_stage(), arb_status()).prop_map(|(stage, status)| BuildOutcome { stage, status })
}

pub fn arb_event() -> impl Strategy<Value = PipelineEvent> {
    (arb_project(), prop::collection::vec(arb_build_outcome(), 0..8))
        .prop_map(|(project, builds)| PipelineEvent::new(project, builds))
}

pub fn arb_command_rule() -> impl Strategy<Value = CommandRule> {
    (arb_stage(), "/bin/[a-z]{1,6}").prop_map(|(stage, cmd)| CommandRule { stage, cmd })
}

pub fn arb_repository_rule() -> impl Strategy<Value = RepositoryRule> {
    (arb_project(), prop::collection::vec(arb_command_rule(), 0..5))
        .prop_map(|(name, commands)| RepositoryRule { name, commands })
}

pub fn arb_configuration() -> impl Strategy<Value = Configuration> {
    prop::collection::vec(arb_repository_rule(), 0..5).prop_map(|repositories| Configuration {
        port: 8080,
        repositories,
        ..Configuration::default()
    })
}
