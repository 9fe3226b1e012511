use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::github::GithubRepoName;

/// Git reference on which the dispatched workflow runs, unless configured otherwise.
pub const DEFAULT_WORKFLOW_REF: &str = "main";

/// Path on which GitHub webhooks are received, unless configured otherwise.
pub const DEFAULT_WEBHOOK_PATH: &str = "/api/webhook";

/// The central repository and workflow that every relayed notification triggers.
///
/// Loaded once at startup and shared read-only by all relay tasks.
#[derive(Clone, Debug)]
pub struct DispatchTarget {
    pub repository: GithubRepoName,
    /// Workflow file name (e.g. `ci.yml`) or numeric workflow id.
    pub workflow_id: String,
    pub git_ref: String,
}

impl DispatchTarget {
    pub fn new(repository: GithubRepoName, workflow_id: impl Into<String>) -> Self {
        Self {
            repository,
            workflow_id: workflow_id.into(),
            git_ref: DEFAULT_WORKFLOW_REF.to_string(),
        }
    }

    pub fn with_ref(self, git_ref: impl Into<String>) -> Self {
        Self {
            git_ref: git_ref.into(),
            ..self
        }
    }
}

impl Display for DispatchTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.repository, self.workflow_id, self.git_ref)
    }
}

/// Set of `pull_request` webhook actions that produce a notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerActions(BTreeSet<String>);

impl TriggerActions {
    pub fn contains(&self, action: &str) -> bool {
        self.0.contains(action)
    }
}

impl Default for TriggerActions {
    fn default() -> Self {
        Self(BTreeSet::from(["opened".to_string()]))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerActionsError {
    #[error("no trigger action was given")]
    Empty,
    #[error("unsupported pull request action `{0}` (expected opened, synchronize or reopened)")]
    Unsupported(String),
}

impl FromStr for TriggerActions {
    type Err = TriggerActionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut actions = BTreeSet::new();
        for action in value.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            match action {
                "opened" | "synchronize" | "reopened" => {
                    actions.insert(action.to_string());
                }
                _ => return Err(TriggerActionsError::Unsupported(action.to_string())),
            }
        }
        if actions.is_empty() {
            return Err(TriggerActionsError::Empty);
        }
        Ok(Self(actions))
    }
}

impl Display for TriggerActions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let actions: Vec<&str> = self.0.iter().map(String::as_str).collect();
        f.write_str(&actions.join(","))
    }
}
