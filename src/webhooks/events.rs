//! Normalized pipeline event types.
//!
//! GitLab has sent pipeline webhooks in more than one shape over time. The
//! parser reduces every shape to [`PipelineEvent`], which carries only what
//! dispatch needs plus a couple of optional fields used as log context.

use crate::types::{ProjectPath, Stage};

/// Status of one build (job) in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildStatus {
    Success,
    Failed,
    Running,
    Pending,
    Canceled,
    Skipped,
    /// A status this crate does not name (e.g. `manual`, `created`).
    Other(String),
}

impl BuildStatus {
    /// Parses a GitLab status string. Matching is exact.
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => BuildStatus::Success,
            "failed" => BuildStatus::Failed,
            "running" => BuildStatus::Running,
            "pending" => BuildStatus::Pending,
            "canceled" => BuildStatus::Canceled,
            "skipped" => BuildStatus::Skipped,
            other => BuildStatus::Other(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success)
    }
}

/// The outcome of one build in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub stage: Stage,
    pub status: BuildStatus,
}

impl BuildOutcome {
    pub fn new(stage: impl Into<Stage>, status: BuildStatus) -> Self {
        BuildOutcome {
            stage: stage.into(),
            status,
        }
    }

    /// Returns true if this build succeeded in `stage`.
    pub fn succeeded_in(&self, stage: &Stage) -> bool {
        self.status.is_success() && &self.stage == stage
    }
}

/// A decoded pipeline webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineEvent {
    /// `project.path_with_namespace` of the originating project.
    pub project: ProjectPath,

    /// Per-build outcomes, in payload order.
    pub builds: Vec<BuildOutcome>,

    /// `object_kind` of the payload, when present (normally `pipeline`).
    pub object_kind: Option<String>,

    /// Commit id from the richer payload shape, when present.
    pub commit_id: Option<String>,
}

impl PipelineEvent {
    pub fn new(project: impl Into<ProjectPath>, builds: Vec<BuildOutcome>) -> Self {
        PipelineEvent {
            project: project.into(),
            builds,
            object_kind: None,
            commit_id: None,
        }
    }

    /// Returns true if any build in `stage` succeeded.
    pub fn stage_succeeded(&self, stage: &Stage) -> bool {
        self.builds.iter().any(|b| b.succeeded_in(stage))
    }
}
