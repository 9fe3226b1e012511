use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::config::TriggerActions;
use crate::github::server::ServerStateRef;
use crate::relay::Notification;

/// Webhook payloads larger than this are rejected.
const MAX_WEBHOOK_BODY_SIZE: usize = 25 * 1024 * 1024;

#[derive(serde::Deserialize, Debug)]
struct WebhookInstallation {
    id: u64,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookHeadRepository {
    full_name: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookHead {
    #[serde(rename = "ref")]
    ref_field: String,
    /// `null` when the fork the pull request comes from has been deleted.
    repo: Option<WebhookHeadRepository>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequestInner {
    number: u64,
    head: WebhookHead,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequest<'a> {
    action: &'a str,
    installation: Option<WebhookInstallation>,
    pull_request: WebhookPullRequestInner,
}

/// axum extractor for GitHub pull request webhooks that should be relayed.
///
/// Requests that are verified but do not describe a relayed event are rejected with
/// [`StatusCode::OK`], so that GitHub does not consider the delivery failed.
#[derive(Debug)]
pub struct GitHubWebhook(pub Notification);

#[async_trait]
impl FromRequest<ServerStateRef> for GitHubWebhook {
    type Rejection = StatusCode;

    async fn from_request(request: Request, state: &ServerStateRef) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        // Eagerly load body
        let body: Bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_SIZE)
            .await
            .map_err(|error| {
                tracing::error!("Parsing webhook body failed: {error:?}");
                StatusCode::BAD_REQUEST
            })?;

        // Verify that the request is valid
        if !verify_gh_signature(&parts.headers, &body, state.get_webhook_secret()) {
            tracing::error!("Webhook request failed, could not authenticate webhook");
            return Err(StatusCode::BAD_REQUEST);
        }

        // Parse webhook content
        match parse_webhook_event(parts, &body, state.get_trigger_actions()) {
            Ok(Some(notification)) => Ok(GitHubWebhook(notification)),
            Ok(None) => Err(StatusCode::OK),
            Err(error) => {
                tracing::error!("Cannot parse webhook event: {error:?}");
                Err(StatusCode::BAD_REQUEST)
            }
        }
    }
}

fn parse_webhook_event(
    request: Parts,
    body: &[u8],
    actions: &TriggerActions,
) -> anyhow::Result<Option<Notification>> {
    let Some(event_type) = request.headers.get("x-github-event") else {
        return Err(anyhow::anyhow!("x-github-event header not found"));
    };

    match event_type.as_bytes() {
        b"pull_request" => {
            let payload: WebhookPullRequest = serde_json::from_slice(body)?;
            parse_pull_request(payload, actions)
        }
        b"ping" => {
            tracing::info!("Received webhook ping");
            Ok(None)
        }
        _ => {
            tracing::debug!("Ignoring unknown event type {:?}", event_type.to_str());
            Ok(None)
        }
    }
}

fn parse_pull_request(
    payload: WebhookPullRequest,
    actions: &TriggerActions,
) -> anyhow::Result<Option<Notification>> {
    let pr_number = payload.pull_request.number;
    if !actions.contains(payload.action) {
        tracing::debug!(
            "Ignoring pull request #{pr_number} event with action {}",
            payload.action
        );
        return Ok(None);
    }

    let head = payload.pull_request.head;
    let Some(repo) = head.repo else {
        tracing::warn!("Ignoring pull request #{pr_number}, its source repository was deleted");
        return Ok(None);
    };

    let notification = Notification::new(
        payload.installation.map(|installation| installation.id.into()),
        repo.full_name,
        head.ref_field,
        pr_number,
    )?;
    tracing::info!("Received {notification}");
    Ok(Some(notification))
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies that the request is properly signed by GitHub with SHA-256 and the passed `secret`.
fn verify_gh_signature(
    headers: &HeaderMap<HeaderValue>,
    body: &[u8],
    secret: &WebhookSecret,
) -> bool {
    let Some(signature) = headers.get("x-hub-signature-256").map(|v| v.as_bytes()) else {
        return false;
    };
    let Some(signature) = signature
        .strip_prefix(b"sha256=")
        .and_then(|v| hex::decode(v).ok())
    else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Wrapper for a secret which is zeroed on drop and can be exposed only through the [`WebhookSecret::expose`] method.
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: String) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }
}
