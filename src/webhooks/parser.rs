//! GitLab pipeline webhook parser.
//!
//! Parses raw webhook JSON into a [`PipelineEvent`].
//!
//! # Accepted shapes
//!
//! Two payload shapes are seen in practice:
//!
//! 1. A flat one: `object_kind`, `builds: [{stage, status}]` and
//!    `project.path_with_namespace`.
//! 2. A richer one that also carries `commit {id, message, timestamp, url,
//!    author}` and more `project` fields (`name`, `description`, ...).
//!
//! Both decode to the same event. Unknown fields are ignored, every field
//! except the project path may be absent, and a build entry that is `null` or
//! missing its stage or status is skipped.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{ProjectPath, Stage};

use super::events::{BuildOutcome, BuildStatus, PipelineEvent};

/// Error type for webhook decoding failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON deserialization failed (malformed JSON or a field of the wrong type).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload has no `project.path_with_namespace`.
    #[error("missing project.path_with_namespace in payload")]
    MissingProject,
}

// ============================================================================
// Raw payload structures for deserialization
//
// These follow GitLab's JSON. Everything is optional so that either payload
// shape deserializes; required fields are checked explicitly afterwards.
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPipelinePayload {
    object_kind: Option<String>,
    builds: Option<Vec<Option<RawBuild>>>,
    project: Option<RawProject>,
    commit: Option<RawCommit>,
}

#[derive(Debug, Deserialize)]
struct RawBuild {
    stage: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    path_with_namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    id: Option<String>,
}

/// Decodes a pipeline webhook payload.
///
/// # Examples
///
/// ```
/// use pipeline_hook::webhooks::decode;
///
/// let payload = br#"{
///     "object_kind": "pipeline",
///     "builds": [{ "stage": "deploy", "status": "success" }],
///     "project": { "path_with_namespace": "team/app" }
/// }"#;
///
/// let event = decode(payload).unwrap();
/// assert_eq!(event.project.as_str(), "team/app");
/// assert_eq!(event.builds.len(), 1);
/// ```
pub fn decode(payload: &[u8]) -> Result<PipelineEvent, DecodeError> {
    let raw: RawPipelinePayload = serde_json::from_slice(payload)?;

    let project = raw
        .project
        .and_then(|p| p.path_with_namespace)
        .filter(|p| !p.is_empty())
        .ok_or(DecodeError::MissingProject)?;

    let builds = raw
        .builds
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(|b| match (b.stage, b.status) {
            (Some(stage), Some(status)) => Some(BuildOutcome {
                stage: Stage::new(stage),
                status: BuildStatus::parse(&status),
            }),
            _ => None,
        })
        .collect();

    Ok(PipelineEvent {
        project: ProjectPath::new(project),
        builds,
        object_kind: raw.object_kind,
        commit_id: raw.commit.and_then(|c| c.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_json(value: serde_json::Value) -> Result<PipelineEvent, DecodeError> {
        decode(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn decode_flat_shape() {
        let event = decode_json(json!({
            "object_kind": "pipeline",
            "builds": [
                { "stage": "build", "status": "success" },
                { "stage": "deploy", "status": "failed" }
            ],
            "project": { "path_with_namespace": "team/app" }
        }))
        .unwrap();

        assert_eq!(event.project, ProjectPath::new("team/app"));
        assert_eq!(event.object_kind.as_deref(), Some("pipeline"));
        assert_eq!(event.commit_id, None);
        assert_eq!(
            event.builds,
            vec![
                BuildOutcome::new("build", BuildStatus::Success),
                BuildOutcome::new("deploy", BuildStatus::Failed),
            ]
        );
    }

    #[test]
    fn decode_rich_shape() {
        let event = decode_json(json!({
            "object_kind": "pipeline",
            "object_attributes": { "id": 31, "ref": "main", "status": "success" },
            "user": { "name": "Administrator", "username": "root" },
            "project": {
                "name": "app",
                "description": "The app",
                "web_url": "http://gitlab.example.com/team/app",
                "path_with_namespace": "team/app"
            },
            "commit": {
                "id": "bcbb5ec396a2c0f828686f14fac9b80b780504f2",
                "message": "test\n",
                "timestamp": "2016-08-12T17:23:21+02:00",
                "url": "http://example.com/team/app/commit/bcbb5ec3",
                "author": { "name": "User", "email": "user@gitlab.com" }
            },
            "builds": [
                {
                    "id": 380,
                    "stage": "deploy",
                    "name": "production",
                    "status": "skipped",
                    "when": "manual",
                    "manual": true
                },
                {
                    "id": 377,
                    "stage": "test",
                    "name": "test-image",
                    "status": "success"
                }
            ]
        }))
        .unwrap();

        assert_eq!(event.project, ProjectPath::new("team/app"));
        assert_eq!(
            event.commit_id.as_deref(),
            Some("bcbb5ec396a2c0f828686f14fac9b80b780504f2")
        );
        assert_eq!(event.builds.len(), 2);
        assert!(event.stage_succeeded(&Stage::from("test")));
        assert!(!event.stage_succeeded(&Stage::from("deploy")));
    }

    #[test]
    fn missing_builds_is_empty_list() {
        let event = decode_json(json!({
            "project": { "path_with_namespace": "team/app" }
        }))
        .unwrap();

        assert!(event.builds.is_empty());
    }

    #[test]
    fn null_builds_is_empty_list() {
        let event = decode_json(json!({
            "builds": null,
            "project": { "path_with_namespace": "team/app" }
        }))
        .unwrap();

        assert!(event.builds.is_empty());
    }

    #[test]
    fn incomplete_build_entries_are_skipped() {
        let event = decode_json(json!({
            "builds": [
                { "stage": "deploy" },
                { "status": "success" },
                { "stage": "deploy", "status": "success" }
            ],
            "project": { "path_with_namespace": "team/app" }
        }))
        .unwrap();

        assert_eq!(
            event.builds,
            vec![BuildOutcome::new("deploy", BuildStatus::Success)]
        );
    }

    #[test]
    fn null_build_entries_are_skipped() {
        let event = decode_json(json!({
            "builds": [null, { "stage": "deploy", "status": "success" }, null],
            "project": { "path_with_namespace": "team/app" }
        }))
        .unwrap();

        assert_eq!(
            event.builds,
            vec![BuildOutcome::new("deploy", BuildStatus::Success)]
        );
    }

    #[test]
    fn missing_project_is_error() {
        let result = decode_json(json!({
            "builds": [{ "stage": "deploy", "status": "success" }]
        }));
        assert!(matches!(result, Err(DecodeError::MissingProject)));
    }

    #[test]
    fn empty_project_path_is_error() {
        let result = decode_json(json!({
            "project": { "name": "app", "path_with_namespace": "" }
        }));
        assert!(matches!(result, Err(DecodeError::MissingProject)));
    }

    #[test]
    fn malformed_json_is_error() {
        let result = decode(b"{\"project\": ");
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    #[test]
    fn wrong_type_is_error() {
        let result = decode_json(json!({
            "builds": "deploy",
            "project": { "path_with_namespace": "team/app" }
        }));
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    #[test]
    fn non_object_payload_is_error() {
        assert!(decode(b"[]").is_err());
        assert!(decode(b"").is_err());
    }
}
