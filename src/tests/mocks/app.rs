use serde::Serialize;
use url::Url;
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

use super::user::{default_owner, User};
use super::Installation;
use crate::github::GithubRepoName;

pub(super) fn default_app_id() -> u64 {
    1
}

#[derive(Serialize)]
struct App {
    id: u64,
    node_id: String,
    owner: User,
    name: String,
    external_url: Url,
    html_url: Url,
    permissions: Permissions,
    events: Vec<String>,
}

impl Default for App {
    fn default() -> Self {
        App {
            id: default_app_id(),
            node_id: "".to_string(),
            owner: default_owner(),
            name: "dispatch-relay".to_string(),
            html_url: "https://github.com/apps/dispatch-relay".parse().unwrap(),
            external_url: "https://relay.acme.dev".parse().unwrap(),
            permissions: Permissions {},
            events: vec!["pull_request".to_string()],
        }
    }
}

pub(super) async fn setup_app_mock(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(App::default()))
        .mount(mock_server)
        .await;
}

#[derive(Serialize)]
struct RepositoryInstallation {
    id: u64,
    app_id: u64,
    account: User,
    permissions: Permissions,
    events: Vec<String>,
}

pub(super) async fn setup_repo_installation_mock(
    mock_server: &MockServer,
    repo: &GithubRepoName,
    installation: &Installation,
) {
    let response = match installation {
        Installation::Installed(id) => {
            ResponseTemplate::new(200).set_body_json(RepositoryInstallation {
                id: *id,
                app_id: default_app_id(),
                account: default_owner(),
                permissions: Permissions {},
                events: vec!["pull_request".to_string()],
            })
        }
        Installation::NotInstalled => ResponseTemplate::new(404).set_body_json(
            serde_json::json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest/apps/apps#get-a-repository-installation-for-the-authenticated-app"
            }),
        ),
        Installation::Failing(status) => ResponseTemplate::new(*status)
            .set_body_json(serde_json::json!({ "message": "Lookup failed" })),
    };
    Mock::given(method("GET"))
        .and(path(format!(
            "/repos/{}/{}/installation",
            repo.owner(),
            repo.name()
        )))
        .respond_with(response)
        .mount(mock_server)
        .await;
}

#[derive(Serialize)]
struct InstallationToken {
    token: String,
    expires_at: String,
    permissions: Permissions,
}

impl Default for InstallationToken {
    fn default() -> Self {
        InstallationToken {
            token: "ghs_test".to_string(),
            expires_at: "2099-01-01T00:00:00Z".to_string(),
            permissions: Permissions {},
        }
    }
}

pub(super) async fn setup_installation_token_mock(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex("^/app/installations/\\d+/access_tokens$"))
        .respond_with(ResponseTemplate::new(201).set_body_json(InstallationToken::default()))
        .mount(mock_server)
        .await;
}

#[derive(Serialize)]
struct Permissions {}
