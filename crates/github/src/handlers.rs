use std::{future::Future, sync::Arc};

use anyhow::Result;

use crate::{
    PlatformClient,
    credentials::CredentialProvider,
    events::{
        CheckRunEvent, CheckRunWebhookEventAction, CheckSuiteEvent, CheckSuiteWebhookEventAction,
        IssuesEvent, IssuesWebhookEventAction, PullRequestEvent, PullRequestWebhookEventAction,
        WebhookEvent,
    },
    workflow::{CheckRunWorkflow, NEXT_ACTION, RERUN_ACTION},
};

/// Shared state available to every event handler.
pub struct EventContext<P> {
    pub credentials: Arc<P>,
    pub workflow: CheckRunWorkflow,
}

impl<P> Clone for EventContext<P> {
    fn clone(&self) -> Self {
        Self { credentials: self.credentials.clone(), workflow: self.workflow.clone() }
    }
}

pub trait HandleEvent {
    /// Reacts to the event. Actions the agent does not act on succeed without
    /// touching the platform.
    fn handle<P: CredentialProvider>(
        &self,
        ctx: &EventContext<P>,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl HandleEvent for WebhookEvent {
    async fn handle<P: CredentialProvider>(&self, ctx: &EventContext<P>) -> Result<()> {
        match self {
            Self::Issues(event) => event.handle(ctx).await,
            Self::PullRequest(event) => event.handle(ctx).await,
            Self::CheckSuite(event) => event.handle(ctx).await,
            Self::CheckRun(event) => event.handle(ctx).await,
            Self::Unrecognized(kind) => {
                tracing::info!("Ignoring unrecognized event {}", kind);
                Ok(())
            }
        }
    }
}

impl HandleEvent for IssuesEvent {
    async fn handle<P: CredentialProvider>(&self, ctx: &EventContext<P>) -> Result<()> {
        tracing::info!(
            "Issue event {:?} for {}#{} (installation {})",
            self.action,
            self.repository.coords(),
            self.issue.number,
            self.installation.id
        );
        if self.action != IssuesWebhookEventAction::Opened {
            return Ok(());
        }
        let client = ctx.credentials.obtain(self.installation.id).await?;
        let body = format!("Hello @{}, thanks for opening this issue!", self.issue.user.login);
        client.create_comment(&self.repository.coords(), self.issue.number, &body).await?;
        Ok(())
    }
}

impl HandleEvent for PullRequestEvent {
    async fn handle<P: CredentialProvider>(&self, ctx: &EventContext<P>) -> Result<()> {
        let pr = &self.pull_request;
        tracing::info!(
            "Pull request event {:?} for {}#{} (installation {})",
            self.action,
            self.repository.coords(),
            pr.number,
            self.installation.id
        );
        if self.action != PullRequestWebhookEventAction::Opened {
            return Ok(());
        }
        let client = ctx.credentials.obtain(self.installation.id).await?;
        let body = format!(
            "@{} wants to merge `{}` into `{}`",
            pr.user.login, pr.head.ref_field, pr.base.ref_field
        );
        client.create_comment(&self.repository.coords(), pr.number, &body).await?;
        // TODO: create a check suite for the head commit once check suites are
        // requested explicitly instead of relying on automatic creation.
        Ok(())
    }
}

impl HandleEvent for CheckSuiteEvent {
    async fn handle<P: CredentialProvider>(&self, ctx: &EventContext<P>) -> Result<()> {
        tracing::info!(
            "Check suite event {:?} for {} ({})",
            self.action,
            self.repository.coords(),
            self.check_suite.head_sha
        );
        if !matches!(
            self.action,
            CheckSuiteWebhookEventAction::Requested | CheckSuiteWebhookEventAction::Rerequested
        ) {
            return Ok(());
        }
        let client = ctx.credentials.obtain(self.installation.id).await?;
        let repo = self.repository.coords();
        // Best effort: the suite is still reported as handled when creation fails.
        match client
            .create_check_run(&repo, ctx.workflow.queued_check_run(&self.check_suite.head_sha))
            .await
        {
            Ok(run) => tracing::info!("Created check run {} on {}", run.id, repo),
            Err(e) => tracing::error!(
                "Failed to create check run for suite {}: {:?}",
                self.check_suite.id,
                e
            ),
        }
        Ok(())
    }
}

impl HandleEvent for CheckRunEvent {
    async fn handle<P: CredentialProvider>(&self, ctx: &EventContext<P>) -> Result<()> {
        if self.action != CheckRunWebhookEventAction::RequestedAction {
            return Ok(());
        }
        let Some(requested) = &self.requested_action else {
            tracing::warn!("Check run {} requested_action without an action", self.check_run.id);
            return Ok(());
        };
        let repo = self.repository.coords();
        tracing::info!(
            "Check run {} on {}: requested action {:?}",
            self.check_run.id,
            repo,
            requested.identifier
        );
        match requested.identifier.as_str() {
            RERUN_ACTION => {
                let client = ctx.credentials.obtain(self.installation.id).await?;
                let run = client
                    .create_check_run(&repo, ctx.workflow.rerun_check_run(&self.check_run.head_sha))
                    .await?;
                tracing::info!("Created check run {} replacing {}", run.id, self.check_run.id);
            }
            NEXT_ACTION => {
                let client = ctx.credentials.obtain(self.installation.id).await?;
                // Dropping the handle detaches completion from this request.
                drop(ctx.workflow.start(&client, &repo, &self.check_run).await?);
            }
            _ => {}
        }
        Ok(())
    }
}
