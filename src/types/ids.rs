//! Newtype wrappers for domain identifiers.
//!
//! These keep a project path from being passed where a stage name is expected
//! (both are plain strings on the wire) and make signatures self-documenting.

use serde::Deserialize;
use std::fmt;

/// A GitLab project's full path, including its namespace (e.g. `team/app`).
///
/// This is the `project.path_with_namespace` field of a pipeline webhook and
/// the `name` field of a repository rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ProjectPath(pub String);

impl ProjectPath {
    pub fn new(s: impl Into<String>) -> Self {
        ProjectPath(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProjectPath {
    fn from(s: &str) -> Self {
        ProjectPath(s.to_string())
    }
}

impl From<String> for ProjectPath {
    fn from(s: String) -> Self {
        ProjectPath(s)
    }
}

/// A pipeline stage name (e.g. `build`, `test`, `deploy`).
///
/// Compared byte-for-byte; GitLab stage names are case sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Stage(pub String);

impl Stage {
    pub fn new(s: impl Into<String>) -> Self {
        Stage(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Stage {
    fn from(s: &str) -> Self {
        Stage(s.to_string())
    }
}

impl From<String> for Stage {
    fn from(s: String) -> Self {
        Stage(s)
    }
}
