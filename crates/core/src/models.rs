use std::fmt;

use serde::{Deserialize, Serialize};

/// GitHub App installation ID. Every outbound call is scoped to exactly one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub u64);

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckRunId(pub u64);

impl fmt::Display for CheckRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

/// Owner login and repository name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoCoords {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Check run lifecycle status.
///
/// The agent only ever writes `Queued` (implicitly, on creation), `InProgress` and
/// `Completed`; the remaining values are accepted when decoding deliveries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Stale,
}

pub const MAX_ACTION_IDENTIFIER_LEN: usize = 20;
pub const MAX_ACTION_LABEL_LEN: usize = 20;
pub const MAX_ACTION_DESCRIPTION_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAction {
    #[error("action identifier {0:?} exceeds 20 characters")]
    Identifier(String),
    #[error("action label {0:?} exceeds 20 characters")]
    Label(String),
    #[error("action description {0:?} exceeds 40 characters")]
    Description(String),
}

/// A follow-up button offered to the user on a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunAction {
    pub label: String,
    pub description: String,
    pub identifier: String,
}

impl CheckRunAction {
    pub fn new(
        identifier: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, InvalidAction> {
        let (identifier, label, description) =
            (identifier.into(), label.into(), description.into());
        if identifier.chars().count() > MAX_ACTION_IDENTIFIER_LEN {
            return Err(InvalidAction::Identifier(identifier));
        }
        if label.chars().count() > MAX_ACTION_LABEL_LEN {
            return Err(InvalidAction::Label(label));
        }
        if description.chars().count() > MAX_ACTION_DESCRIPTION_LEN {
            return Err(InvalidAction::Description(description));
        }
        Ok(Self { label, description, identifier })
    }
}

/// A check run as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: CheckRunId,
    pub name: String,
    pub head_sha: String,
    pub status: CheckRunStatus,
    #[serde(default)]
    pub conclusion: Option<CheckRunConclusion>,
    #[serde(default)]
    pub actions: Vec<CheckRunAction>,
}

/// Body of a check run creation request. Status is left unset so the platform
/// queues the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCheckRun {
    pub name: String,
    pub head_sha: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<CheckRunAction>,
}

/// Body of a check run update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRunUpdate {
    pub name: String,
    pub status: CheckRunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<CheckRunConclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<CheckRunAction>>,
}
