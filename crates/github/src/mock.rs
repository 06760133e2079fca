//! In-memory stand-ins for the GitHub API, recording every successful call.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Result, anyhow, bail};
use checkbot_core::models::{
    CheckRun, CheckRunId, CheckRunStatus, CheckRunUpdate, CommentId, InstallationId, NewCheckRun,
    RepoCoords,
};

use crate::{PlatformClient, credentials::CredentialProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateComment { repo: RepoCoords, number: u64, body: String },
    CreateCheckRun { repo: RepoCoords, check_run: NewCheckRun },
    UpdateCheckRun { repo: RepoCoords, id: CheckRunId, update: CheckRunUpdate },
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    check_runs: HashMap<CheckRunId, CheckRun>,
    next_id: u64,
    fail_all: bool,
    fail_update_to: Option<CheckRunStatus>,
}

#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<Call> { self.lock().calls.clone() }

    pub fn check_run_status(&self, id: CheckRunId) -> Option<CheckRunStatus> {
        self.lock().check_runs.get(&id).map(|run| run.status)
    }

    /// Fail every subsequent call.
    pub fn fail_all(&self) { self.lock().fail_all = true; }

    /// Fail updates that move a check run to `status`.
    pub fn fail_update_to(&self, status: CheckRunStatus) {
        self.lock().fail_update_to = Some(status);
    }
}

impl PlatformClient for MockClient {
    async fn create_comment(
        &self,
        repo: &RepoCoords,
        number: u64,
        body: &str,
    ) -> Result<CommentId> {
        let mut state = self.lock();
        if state.fail_all {
            bail!("comment creation rejected");
        }
        state.calls.push(Call::CreateComment {
            repo: repo.clone(),
            number,
            body: body.to_string(),
        });
        Ok(CommentId(state.calls.len() as u64))
    }

    async fn create_check_run(
        &self,
        repo: &RepoCoords,
        check_run: NewCheckRun,
    ) -> Result<CheckRun> {
        let mut state = self.lock();
        if state.fail_all {
            bail!("check run creation rejected");
        }
        state.next_id += 1;
        let run = CheckRun {
            id: CheckRunId(1000 + state.next_id),
            name: check_run.name.clone(),
            head_sha: check_run.head_sha.clone(),
            status: CheckRunStatus::Queued,
            conclusion: None,
            actions: check_run.actions.clone(),
        };
        state.check_runs.insert(run.id, run.clone());
        state.calls.push(Call::CreateCheckRun { repo: repo.clone(), check_run });
        Ok(run)
    }

    async fn update_check_run(
        &self,
        repo: &RepoCoords,
        id: CheckRunId,
        update: CheckRunUpdate,
    ) -> Result<CheckRun> {
        let mut state = self.lock();
        if state.fail_all || state.fail_update_to == Some(update.status) {
            return Err(anyhow!("check run {id} update to {:?} rejected", update.status));
        }
        let run = state.check_runs.entry(id).or_insert_with(|| CheckRun {
            id,
            name: update.name.clone(),
            head_sha: String::new(),
            status: CheckRunStatus::Queued,
            conclusion: None,
            actions: vec![],
        });
        run.name = update.name.clone();
        run.status = update.status;
        run.conclusion = update.conclusion;
        if let Some(actions) = &update.actions {
            run.actions = actions.clone();
        }
        let run = run.clone();
        state.calls.push(Call::UpdateCheckRun { repo: repo.clone(), id, update });
        Ok(run)
    }
}

/// Hands out clones of one [`MockClient`], recording which installations asked.
#[derive(Clone, Default)]
pub struct MockCredentials {
    pub client: MockClient,
    fail: bool,
    obtained: Arc<Mutex<Vec<InstallationId>>>,
}

impl MockCredentials {
    pub fn failing() -> Self { Self { fail: true, ..Default::default() } }

    pub fn obtained(&self) -> Vec<InstallationId> {
        self.obtained.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl CredentialProvider for MockCredentials {
    type Client = MockClient;

    async fn obtain(&self, installation_id: InstallationId) -> Result<MockClient> {
        self.obtained.lock().unwrap_or_else(|e| e.into_inner()).push(installation_id);
        if self.fail {
            bail!("installation {installation_id} rejected");
        }
        Ok(self.client.clone())
    }
}
