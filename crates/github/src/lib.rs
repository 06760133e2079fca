pub mod credentials;
pub mod events;
pub mod handlers;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod webhook;
pub mod workflow;

use std::future::Future;

use anyhow::{Context, Result};
use checkbot_core::models::{
    CheckRun, CheckRunId, CheckRunUpdate, CommentId, NewCheckRun, RepoCoords,
};
use octocrab::Octocrab;

/// Outbound calls made on behalf of a single installation.
pub trait PlatformClient: Clone + Send + Sync + 'static {
    fn create_comment(
        &self,
        repo: &RepoCoords,
        number: u64,
        body: &str,
    ) -> impl Future<Output = Result<CommentId>> + Send;

    fn create_check_run(
        &self,
        repo: &RepoCoords,
        check_run: NewCheckRun,
    ) -> impl Future<Output = Result<CheckRun>> + Send;

    fn update_check_run(
        &self,
        repo: &RepoCoords,
        id: CheckRunId,
        update: CheckRunUpdate,
    ) -> impl Future<Output = Result<CheckRun>> + Send;
}

/// Installation-scoped GitHub REST client.
#[derive(Clone)]
pub struct GitHubClient {
    pub client: Octocrab,
}

impl PlatformClient for GitHubClient {
    async fn create_comment(
        &self,
        repo: &RepoCoords,
        number: u64,
        body: &str,
    ) -> Result<CommentId> {
        let comment = self
            .client
            .issues(&repo.owner, &repo.repo)
            .create_comment(number, body)
            .await
            .with_context(|| format!("Failed to create comment on {repo}#{number}"))?;
        Ok(CommentId(comment.id.into_inner()))
    }

    async fn create_check_run(
        &self,
        repo: &RepoCoords,
        check_run: NewCheckRun,
    ) -> Result<CheckRun> {
        let route = format!("/repos/{}/{}/check-runs", repo.owner, repo.repo);
        self.client
            .post(route, Some(&check_run))
            .await
            .with_context(|| {
                format!("Failed to create check run on {repo} ({})", check_run.head_sha)
            })
    }

    async fn update_check_run(
        &self,
        repo: &RepoCoords,
        id: CheckRunId,
        update: CheckRunUpdate,
    ) -> Result<CheckRun> {
        let route = format!("/repos/{}/{}/check-runs/{id}", repo.owner, repo.repo);
        self.client
            .patch(route, Some(&update))
            .await
            .with_context(|| format!("Failed to update check run {id} on {repo}"))
    }
}
