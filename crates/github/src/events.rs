use checkbot_core::models::{CheckRun, InstallationId, RepoCoords};
use serde::Deserialize;

/// Decoding failure for an event kind that the agent acts on.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode {kind} event")]
pub struct DecodeError {
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// A verified webhook delivery, classified by its `X-GitHub-Event` kind.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Issues(IssuesEvent),
    PullRequest(PullRequestEvent),
    CheckSuite(CheckSuiteEvent),
    CheckRun(CheckRunEvent),
    Unrecognized(String),
}

impl WebhookEvent {
    pub fn parse(kind: &str, body: &[u8]) -> Result<Self, DecodeError> {
        fn decode<'a, T: Deserialize<'a>>(
            kind: &'static str,
            body: &'a [u8],
        ) -> Result<T, DecodeError> {
            serde_json::from_slice(body).map_err(|source| DecodeError { kind, source })
        }
        Ok(match kind {
            "issues" => Self::Issues(decode("issues", body)?),
            "pull_request" => Self::PullRequest(decode("pull_request", body)?),
            "check_suite" => Self::CheckSuite(decode("check_suite", body)?),
            "check_run" => Self::CheckRun(decode("check_run", body)?),
            other => Self::Unrecognized(other.to_string()),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Issues(_) => "issues",
            Self::PullRequest(_) => "pull_request",
            Self::CheckSuite(_) => "check_suite",
            Self::CheckRun(_) => "check_run",
            Self::Unrecognized(kind) => kind,
        }
    }

    pub fn installation_id(&self) -> Option<InstallationId> {
        match self {
            Self::Issues(e) => Some(e.installation.id),
            Self::PullRequest(e) => Some(e.installation.id),
            Self::CheckSuite(e) => Some(e.installation.id),
            Self::CheckRun(e) => Some(e.installation.id),
            Self::Unrecognized(_) => None,
        }
    }

    pub fn repository(&self) -> Option<&Repository> {
        match self {
            Self::Issues(e) => Some(&e.repository),
            Self::PullRequest(e) => Some(&e.repository),
            Self::CheckSuite(e) => Some(&e.repository),
            Self::CheckRun(e) => Some(&e.repository),
            Self::Unrecognized(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: User,
}

impl Repository {
    pub fn coords(&self) -> RepoCoords {
        RepoCoords { owner: self.owner.login.clone(), repo: self.name.clone() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventInstallation {
    pub id: InstallationId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuesWebhookEventAction {
    Opened,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    pub action: IssuesWebhookEventAction,
    pub issue: Issue,
    pub repository: Repository,
    pub installation: EventInstallation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestWebhookEventAction {
    Opened,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    #[serde(rename = "ref")]
    pub ref_field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub user: User,
    pub base: Branch,
    pub head: Branch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: PullRequestWebhookEventAction,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub installation: EventInstallation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSuiteWebhookEventAction {
    Requested,
    Rerequested,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuite {
    pub id: u64,
    pub head_sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuiteEvent {
    pub action: CheckSuiteWebhookEventAction,
    pub check_suite: CheckSuite,
    pub repository: Repository,
    pub installation: EventInstallation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunWebhookEventAction {
    RequestedAction,
    #[serde(other)]
    Other,
}

/// The offered action the user clicked.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestedAction {
    pub identifier: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunEvent {
    pub action: CheckRunWebhookEventAction,
    pub check_run: CheckRun,
    #[serde(default)]
    pub requested_action: Option<RequestedAction>,
    pub repository: Repository,
    pub installation: EventInstallation,
}

#[cfg(test)]
mod tests {
    use checkbot_core::models::{CheckRunId, CheckRunStatus};
    use serde_json::json;

    use super::*;

    fn repository() -> serde_json::Value {
        json!({ "id": 1, "name": "r", "full_name": "o/r", "owner": { "login": "o", "id": 2 } })
    }

    #[test]
    fn test_parse_issues() {
        let body = json!({
            "action": "opened",
            "issue": { "number": 7, "title": "Bug", "user": { "login": "alice" } },
            "repository": repository(),
            "installation": { "id": 99, "node_id": "x" },
            "sender": { "login": "alice" },
        });
        let event = WebhookEvent::parse("issues", body.to_string().as_bytes()).unwrap();
        let WebhookEvent::Issues(event) = &event else { panic!("unexpected {event:?}") };
        assert_eq!(event.action, IssuesWebhookEventAction::Opened);
        assert_eq!(event.issue.number, 7);
        assert_eq!(event.issue.user.login, "alice");
        assert_eq!(event.installation.id, InstallationId(99));
        assert_eq!(event.repository.coords().to_string(), "o/r");
    }

    #[test]
    fn test_unknown_action_is_not_an_error() {
        let body = json!({
            "action": "milestoned",
            "issue": { "number": 7, "user": { "login": "alice" } },
            "repository": repository(),
            "installation": { "id": 99 },
        });
        let event = WebhookEvent::parse("issues", body.to_string().as_bytes()).unwrap();
        let WebhookEvent::Issues(event) = event else { panic!("unexpected event kind") };
        assert_eq!(event.action, IssuesWebhookEventAction::Other);
    }

    #[test]
    fn test_parse_pull_request() {
        let body = json!({
            "action": "opened",
            "number": 3,
            "pull_request": {
                "number": 3,
                "user": { "login": "bob" },
                "base": { "ref": "main", "sha": "aaa" },
                "head": { "ref": "feature", "sha": "bbb" },
            },
            "repository": repository(),
            "installation": { "id": 5 },
        });
        let event = WebhookEvent::parse("pull_request", body.to_string().as_bytes()).unwrap();
        let WebhookEvent::PullRequest(event) = event else { panic!("unexpected event kind") };
        assert_eq!(event.pull_request.base.ref_field, "main");
        assert_eq!(event.pull_request.head.ref_field, "feature");
    }

    #[test]
    fn test_parse_check_run() {
        let body = json!({
            "action": "requested_action",
            "check_run": {
                "id": 11,
                "name": "checkbot",
                "head_sha": "abc",
                "status": "queued",
                "conclusion": null,
            },
            "requested_action": { "identifier": "next" },
            "repository": repository(),
            "installation": { "id": 5 },
        });
        let event = WebhookEvent::parse("check_run", body.to_string().as_bytes()).unwrap();
        assert_eq!(event.installation_id(), Some(InstallationId(5)));
        let WebhookEvent::CheckRun(event) = event else { panic!("unexpected event kind") };
        assert_eq!(event.action, CheckRunWebhookEventAction::RequestedAction);
        assert_eq!(event.check_run.id, CheckRunId(11));
        assert_eq!(event.check_run.status, CheckRunStatus::Queued);
        assert_eq!(event.requested_action.unwrap().identifier, "next");
    }

    #[test]
    fn test_parse_check_suite_rerequested() {
        let body = json!({
            "action": "rerequested",
            "check_suite": { "id": 1, "head_sha": "abc", "head_branch": null },
            "repository": repository(),
            "installation": { "id": 5 },
        });
        let event = WebhookEvent::parse("check_suite", body.to_string().as_bytes()).unwrap();
        let WebhookEvent::CheckSuite(event) = event else { panic!("unexpected event kind") };
        assert_eq!(event.action, CheckSuiteWebhookEventAction::Rerequested);
        assert_eq!(event.check_suite.head_sha, "abc");
    }

    #[test]
    fn test_unrecognized_kind() {
        let event = WebhookEvent::parse("ping", br#"{"zen":"Keep it logically awesome."}"#).unwrap();
        assert!(matches!(&event, WebhookEvent::Unrecognized(kind) if kind == "ping"));
        assert_eq!(event.installation_id(), None);
    }

    #[test]
    fn test_decode_error() {
        let err = WebhookEvent::parse("issues", br#"{"action":"opened"}"#).unwrap_err();
        assert_eq!(err.kind, "issues");

        // Installation is required for every actionable event.
        let body = json!({
            "action": "requested",
            "check_suite": { "id": 1, "head_sha": "abc" },
            "repository": repository(),
        });
        assert!(WebhookEvent::parse("check_suite", body.to_string().as_bytes()).is_err());
        assert!(WebhookEvent::parse("check_run", b"not json").is_err());
    }
}
