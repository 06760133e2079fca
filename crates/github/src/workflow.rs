use std::time::Duration;

use anyhow::Result;
use checkbot_core::{
    config::WorkflowConfig,
    models::{
        CheckRun, CheckRunAction, CheckRunConclusion, CheckRunId, CheckRunStatus, CheckRunUpdate,
        NewCheckRun, RepoCoords,
    },
};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::PlatformClient;

pub const NEXT_ACTION: &str = "next";
pub const RERUN_ACTION: &str = "rerun";

/// Drives a check run through `queued -> in_progress -> completed`.
///
/// Completion happens on a detached task after `completion_delay`. The task is not
/// tied to the request that started it and nothing reports its outcome back; a
/// failed completion is logged and leaves the run `in_progress`.
#[derive(Debug, Clone)]
pub struct CheckRunWorkflow {
    pub completion_delay: Duration,
    pub check_run_name: String,
    pub rerun_check_run_name: String,
}

impl From<&WorkflowConfig> for CheckRunWorkflow {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            completion_delay: config.completion_delay(),
            check_run_name: config.check_run_name.clone(),
            rerun_check_run_name: config.rerun_check_run_name.clone(),
        }
    }
}

impl Default for CheckRunWorkflow {
    fn default() -> Self { Self::from(&WorkflowConfig::default()) }
}

pub fn next_action() -> CheckRunAction {
    CheckRunAction::new(NEXT_ACTION, "Next", "Proceed to the next step")
        .expect("next action within platform limits")
}

pub fn rerun_action() -> CheckRunAction {
    CheckRunAction::new(RERUN_ACTION, "Rerun", "Run the check again")
        .expect("rerun action within platform limits")
}

impl CheckRunWorkflow {
    /// A queued check run offering the "next" action.
    pub fn queued_check_run(&self, head_sha: &str) -> NewCheckRun {
        NewCheckRun {
            name: self.check_run_name.clone(),
            head_sha: head_sha.to_string(),
            actions: vec![next_action()],
        }
    }

    /// A fresh queued check run replacing a completed one.
    pub fn rerun_check_run(&self, head_sha: &str) -> NewCheckRun {
        NewCheckRun {
            name: self.rerun_check_run_name.clone(),
            head_sha: head_sha.to_string(),
            actions: vec![next_action()],
        }
    }

    /// Moves `check_run` to `in_progress` and, only if that succeeds, schedules its
    /// completion. Returns once the synchronous update is done.
    pub async fn start<C: PlatformClient>(
        &self,
        client: &C,
        repo: &RepoCoords,
        check_run: &CheckRun,
    ) -> Result<JoinHandle<()>> {
        client
            .update_check_run(repo, check_run.id, CheckRunUpdate {
                name: check_run.name.clone(),
                status: CheckRunStatus::InProgress,
                conclusion: None,
                actions: None,
            })
            .await?;
        tracing::info!("Check run {} on {} in progress", check_run.id, repo);
        let name = check_run.name.clone();
        Ok(self.spawn_completion(client.clone(), repo.clone(), check_run.id, name))
    }

    /// Spawns the delayed completion of an in-progress check run.
    pub fn spawn_completion<C: PlatformClient>(
        &self,
        client: C,
        repo: RepoCoords,
        id: CheckRunId,
        name: String,
    ) -> JoinHandle<()> {
        let delay = self.completion_delay;
        let span = tracing::info_span!("check_run_completion", check_run = %id, repo = %repo);
        tokio::spawn(
            async move {
                tracing::debug!("Waiting {:?} before completing {}", delay, name);
                tokio::time::sleep(delay).await;
                let update = CheckRunUpdate {
                    name,
                    status: CheckRunStatus::Completed,
                    conclusion: Some(CheckRunConclusion::Success),
                    actions: Some(vec![rerun_action()]),
                };
                match client.update_check_run(&repo, id, update).await {
                    Ok(_) => tracing::info!("Check run {} on {} completed", id, repo),
                    Err(e) => tracing::error!("Failed to complete check run {}: {:?}", id, e),
                }
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockClient};

    fn repo() -> RepoCoords { RepoCoords { owner: "o".to_string(), repo: "r".to_string() } }

    fn in_flight_run() -> CheckRun {
        CheckRun {
            id: CheckRunId(11),
            name: "checkbot".to_string(),
            head_sha: "abc".to_string(),
            status: CheckRunStatus::Queued,
            conclusion: None,
            actions: vec![next_action()],
        }
    }

    #[test]
    fn test_offered_actions() {
        assert_eq!(next_action().identifier, NEXT_ACTION);
        assert_eq!(rerun_action().identifier, RERUN_ACTION);
        assert_eq!(rerun_action().label, "Rerun");
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_waits_for_delay() {
        let client = MockClient::default();
        let workflow = CheckRunWorkflow {
            completion_delay: Duration::from_secs(10),
            ..Default::default()
        };
        let handle = workflow.start(&client, &repo(), &in_flight_run()).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        let Call::UpdateCheckRun { id, update, .. } = &calls[0] else { panic!("{calls:?}") };
        assert_eq!(*id, CheckRunId(11));
        assert_eq!(update.status, CheckRunStatus::InProgress);

        tokio::time::sleep(Duration::from_millis(9_999)).await;
        assert_eq!(client.calls().len(), 1);

        handle.await.unwrap();
        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        let Call::UpdateCheckRun { id, update, .. } = &calls[1] else { panic!("{calls:?}") };
        assert_eq!(*id, CheckRunId(11));
        assert_eq!(update.status, CheckRunStatus::Completed);
        assert_eq!(update.conclusion, Some(CheckRunConclusion::Success));
        assert_eq!(update.actions, Some(vec![rerun_action()]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_schedules_nothing() {
        let client = MockClient::default();
        client.fail_update_to(CheckRunStatus::InProgress);
        let workflow = CheckRunWorkflow::default();
        assert!(workflow.start(&client, &repo(), &in_flight_run()).await.is_err());

        tokio::time::sleep(workflow.completion_delay * 2).await;
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_completion_is_terminal() {
        let client = MockClient::default();
        client.fail_update_to(CheckRunStatus::Completed);
        let workflow = CheckRunWorkflow::default();
        let handle = workflow.start(&client, &repo(), &in_flight_run()).await.unwrap();

        // The task swallows the error rather than panicking.
        handle.await.unwrap();
        assert_eq!(client.calls().len(), 1);
        assert_eq!(client.check_run_status(CheckRunId(11)), Some(CheckRunStatus::InProgress));
    }
}
