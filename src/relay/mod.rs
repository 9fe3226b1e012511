//! Forwards pull request notifications to a workflow dispatch on the central repository.
use std::fmt::{Display, Formatter};

use octocrab::models::InstallationId;

use crate::config::DispatchTarget;
use crate::github::api::operations::{dispatch_workflow, DispatchError};
use crate::github::api::GithubAppClient;
use crate::github::PullRequestNumber;

pub mod process;

/// A single pull request event that should trigger the workflow.
///
/// Produced by the webhook or queue ingress and consumed exactly once by [`relay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    installation_id: Option<InstallationId>,
    source_repo: String,
    branch: String,
    pr_number: PullRequestNumber,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("source repository name is empty")]
    EmptyRepository,
    #[error("branch name is empty")]
    EmptyBranch,
    #[error("pull request number must be positive")]
    InvalidPullRequestNumber,
}

impl Notification {
    pub fn new(
        installation_id: Option<InstallationId>,
        source_repo: impl Into<String>,
        branch: impl Into<String>,
        pr_number: u64,
    ) -> Result<Self, NotificationError> {
        let source_repo = source_repo.into();
        let branch = branch.into();
        if source_repo.trim().is_empty() {
            return Err(NotificationError::EmptyRepository);
        }
        if branch.trim().is_empty() {
            return Err(NotificationError::EmptyBranch);
        }
        if pr_number == 0 {
            return Err(NotificationError::InvalidPullRequestNumber);
        }
        Ok(Self {
            installation_id,
            source_repo,
            branch,
            pr_number: pr_number.into(),
        })
    }

    /// Installation that delivered the event, if the ingress knows it.
    pub fn installation_id(&self) -> Option<InstallationId> {
        self.installation_id
    }

    /// Full name (`owner/name`) of the repository the pull request comes from.
    pub fn source_repo(&self) -> &str {
        &self.source_repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn pr_number(&self) -> PullRequestNumber {
        self.pr_number
    }

    /// Workflow inputs passed to the dispatched run.
    pub fn dispatch_inputs(&self) -> serde_json::Value {
        serde_json::json!({
            "repo": self.source_repo,
            "branch": self.branch,
            "pr_number": self.pr_number.to_string(),
        })
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PR #{} from {} on branch {}",
            self.pr_number, self.source_repo, self.branch
        )
    }
}

/// Process-wide state shared by all relay tasks. Immutable after startup.
pub struct RelayContext {
    app: GithubAppClient,
    target: DispatchTarget,
}

impl RelayContext {
    pub fn new(app: GithubAppClient, target: DispatchTarget) -> Self {
        Self { app, target }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Dispatched,
    /// The app has no installation on the target repository.
    TargetNotInstalled,
    /// The dispatch call failed. The notification is dropped.
    DispatchFailed,
}

/// Triggers the target workflow for a single notification.
///
/// A missing installation on the target repository and a failed dispatch call are reported
/// through the returned outcome. Other failures (installation lookup, token exchange) are
/// returned as errors. Nothing is retried.
pub async fn relay(ctx: &RelayContext, notification: Notification) -> anyhow::Result<RelayOutcome> {
    tracing::info!(
        installation = ?notification.installation_id(),
        "Relaying {notification}"
    );

    let target = &ctx.target;
    let Some(installation_id) = ctx.app.find_installation(&target.repository).await? else {
        tracing::error!("App is not installed on {}", target.repository);
        return Ok(RelayOutcome::TargetNotInstalled);
    };

    let client = ctx.app.installation_client(installation_id).await?;

    match dispatch_workflow(&client, target, &notification.dispatch_inputs()).await {
        Ok(()) => {
            tracing::info!(
                "Workflow {} dispatched for branch {}",
                target.workflow_id,
                notification.branch()
            );
            Ok(RelayOutcome::Dispatched)
        }
        Err(DispatchError::Rejected { status, message }) => {
            tracing::error!(
                "Could not dispatch workflow {target} for {notification} ({status}): {message}"
            );
            Ok(RelayOutcome::DispatchFailed)
        }
        Err(error) => {
            tracing::error!("Could not dispatch workflow {target} for {notification}: {error:?}");
            Ok(RelayOutcome::DispatchFailed)
        }
    }
}
