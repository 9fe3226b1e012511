use anyhow::Context;
use octocrab::models::{AppId, InstallationId};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretVec};

use crate::github::GithubRepoName;
use operations::{find_repository_installation, InstallationLookup};

pub mod operations;

const PUBLIC_GITHUB_API_HOST: &str = "api.github.com";

/// Resolves the REST API base URL.
///
/// GitHub Enterprise Server exposes its API under `https://<hostname>/api/v3`, while the public
/// instance lives on `https://api.github.com`.
pub fn github_base_url(enterprise_hostname: Option<&str>) -> String {
    let hostname = enterprise_hostname
        .map(|host| {
            host.trim()
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
        })
        .filter(|host| !host.is_empty() && *host != PUBLIC_GITHUB_API_HOST);
    match hostname {
        Some(host) => format!("https://{host}/api/v3"),
        None => format!("https://{PUBLIC_GITHUB_API_HOST}"),
    }
}

/// Creates an octocrab client authenticated as the GitHub App itself (JWT).
///
/// Failed requests are never resent. Installation clients derived from it share this setting.
pub fn create_github_client(
    app_id: AppId,
    github_url: String,
    private_key: SecretVec<u8>,
) -> anyhow::Result<Octocrab> {
    let key = jsonwebtoken::EncodingKey::from_rsa_pem(private_key.expose_secret().as_ref())
        .context("Could not encode private key")?;

    let mut builder = Octocrab::builder();
    builder.add_retry_config(RetryConfig::None);
    builder
        .base_uri(github_url)
        .context("Invalid GitHub API URL")?
        .app(app_id, key)
        .build()
        .context("Could not create octocrab builder")
}

/// App-level access to GitHub.
///
/// This is the only long-lived credential of the relay. Installation tokens are derived from it
/// on demand and are never cached.
#[derive(Clone, Debug)]
pub struct GithubAppClient {
    client: Octocrab,
}

impl GithubAppClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Authenticates as the app and returns its name.
    pub async fn load_app_name(&self) -> anyhow::Result<String> {
        let app = self
            .client
            .current()
            .app()
            .await
            .context("Could not load GitHub App")?;
        Ok(app.name)
    }

    /// Returns the installation of this app on the given repository, or `None` if the app is
    /// not installed there.
    pub async fn find_installation(
        &self,
        repo: &GithubRepoName,
    ) -> anyhow::Result<Option<InstallationId>> {
        match find_repository_installation(&self.client, repo).await? {
            InstallationLookup::Found(id) => Ok(Some(id)),
            InstallationLookup::NotInstalled => Ok(None),
        }
    }

    /// Exchanges the installation id for an installation access token and returns a client
    /// authenticated with it.
    pub async fn installation_client(&self, id: InstallationId) -> anyhow::Result<Octocrab> {
        let (client, _token) = self
            .client
            .installation_and_token(id)
            .await
            .with_context(|| format!("Could not obtain access token for installation {id}"))?;
        Ok(client)
    }
}
