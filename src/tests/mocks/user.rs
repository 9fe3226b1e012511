use serde::Serialize;
use url::Url;

/// Account that owns the GitHub App in tests.
#[derive(Clone, Serialize)]
pub(crate) struct User {
    pub(crate) login: String,
    id: u64,
    node_id: String,
    avatar_url: Url,
    gravatar_id: String,
    url: Url,
    html_url: Url,
    followers_url: Url,
    following_url: Url,
    gists_url: Url,
    starred_url: Url,
    subscriptions_url: Url,
    organizations_url: Url,
    repos_url: Url,
    events_url: Url,
    received_events_url: Url,
    r#type: String,
    site_admin: bool,
}

impl User {
    pub(crate) fn organization(login: &str, id: u64) -> Self {
        let api = format!("https://api.github.com/users/{login}");
        let url = |suffix: &str| -> Url { format!("{api}{suffix}").parse().unwrap() };
        Self {
            login: login.to_string(),
            id,
            node_id: "MDEyOk9yZ2FuaXphdGlvbjE=".to_string(),
            avatar_url: format!("https://avatars.githubusercontent.com/u/{id}?v=4")
                .parse()
                .unwrap(),
            gravatar_id: "".to_string(),
            url: url(""),
            html_url: format!("https://github.com/{login}").parse().unwrap(),
            followers_url: url("/followers"),
            following_url: url("/following{/other_user}"),
            gists_url: url("/gists{/gist_id}"),
            starred_url: url("/starred{/owner}{/repo}"),
            subscriptions_url: url("/subscriptions"),
            organizations_url: url("/orgs"),
            repos_url: url("/repos"),
            events_url: url("/events{/privacy}"),
            received_events_url: url("/received_events"),
            r#type: "Organization".to_string(),
            site_admin: false,
        }
    }
}

pub(crate) fn default_owner() -> User {
    User::organization("acme", 1234)
}
