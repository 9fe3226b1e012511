use http::StatusCode;
use octocrab::models::InstallationId;
use octocrab::Octocrab;
use thiserror::Error;

use crate::config::DispatchTarget;
use crate::github::GithubRepoName;

pub enum InstallationLookup {
    Found(InstallationId),
    NotInstalled,
}

#[derive(serde::Deserialize)]
struct RepositoryInstallation {
    id: InstallationId,
}

/// Looks up the installation of the authenticated app on a repository.
///
/// Documentation: https://docs.github.com/en/rest/apps/apps?apiVersion=2022-11-28#get-a-repository-installation-for-the-authenticated-app
pub async fn find_repository_installation(
    client: &Octocrab,
    repo: &GithubRepoName,
) -> anyhow::Result<InstallationLookup> {
    let url = format!("/repos/{}/{}/installation", repo.owner(), repo.name());
    let response = client
        ._get(url)
        .await
        .map_err(|error| anyhow::anyhow!("Could not look up installation on {repo}: {error:?}"))?;

    let status = response.status();
    let text = client.body_to_string(response).await.unwrap_or_default();
    tracing::trace!("Response from installation lookup of `{repo}`: {status} ({text})");

    match status {
        StatusCode::OK => {
            let installation: RepositoryInstallation = serde_json::from_str(&text)?;
            Ok(InstallationLookup::Found(installation.id))
        }
        StatusCode::NOT_FOUND => Ok(InstallationLookup::NotInstalled),
        _ => Err(anyhow::anyhow!(
            "Could not look up installation on {repo} ({status}): {text}"
        )),
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Dispatch was rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("Network error: {0}")]
    NetworkError(#[from] octocrab::Error),
}

#[derive(serde::Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Triggers a `workflow_dispatch` event for the target workflow.
///
/// Documentation: https://docs.github.com/en/rest/actions/workflows?apiVersion=2022-11-28#create-a-workflow-dispatch-event
pub async fn dispatch_workflow(
    client: &Octocrab,
    target: &DispatchTarget,
    inputs: &serde_json::Value,
) -> Result<(), DispatchError> {
    let url = format!(
        "/repos/{}/{}/actions/workflows/{}/dispatches",
        target.repository.owner(),
        target.repository.name(),
        target.workflow_id
    );
    let request = DispatchRequest {
        git_ref: &target.git_ref,
        inputs,
    };
    let response = client._post(url, Some(&request)).await?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let text = client.body_to_string(response).await.unwrap_or_default();
    tracing::trace!("Response from dispatching `{target}`: {status} ({text})");

    // GitHub reports errors as `{"message": ...}`, fall back to the raw body otherwise.
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|error| error.message)
        .unwrap_or(text);
    Err(DispatchError::Rejected { status, message })
}
