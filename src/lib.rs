//! This is the library of the pull request dispatch relay.
//!
//! GitHub pull request notifications arrive either through a webhook ([`github::server`]) or
//! through a durable queue ([`queue`]) and are forwarded to the [`relay`] process, which triggers
//! a workflow run on a central repository on behalf of the GitHub App.
pub mod config;
pub mod github;
pub mod queue;
pub mod relay;
pub mod utils;

pub use config::{DispatchTarget, TriggerActions};
pub use github::api::{create_github_client, github_base_url, GithubAppClient};
pub use github::server::{create_app, ServerState};
pub use github::WebhookSecret;
pub use relay::process::{create_relay_process, RelayProcess, RelaySender};
pub use relay::{relay, Notification, RelayContext, RelayOutcome};

#[cfg(test)]
mod tests;
