use std::any::Any;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::TriggerActions;
use crate::github::webhook::{GitHubWebhook, WebhookSecret};
use crate::relay::process::RelaySender;

/// Shared server state for all axum handlers.
pub struct ServerState {
    relay_queue: RelaySender,
    webhook_secret: WebhookSecret,
    trigger_actions: TriggerActions,
}

impl ServerState {
    pub fn new(
        relay_queue: RelaySender,
        webhook_secret: WebhookSecret,
        trigger_actions: TriggerActions,
    ) -> Self {
        Self {
            relay_queue,
            webhook_secret,
            trigger_actions,
        }
    }

    pub fn get_webhook_secret(&self) -> &WebhookSecret {
        &self.webhook_secret
    }

    pub fn get_trigger_actions(&self) -> &TriggerActions {
        &self.trigger_actions
    }
}

pub type ServerStateRef = Arc<ServerState>;

/// Creates the HTTP application that receives GitHub webhooks on `webhook_path`.
pub fn create_app(state: ServerState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(github_webhook_handler))
        .route("/health", get(health_handler))
        .layer(ConcurrencyLimitLayer::new(100))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(Arc::new(state))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Router panicked: {err:?}");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "")
}

/// Axum handler that receives a webhook and sends its notification to the relay process.
pub async fn github_webhook_handler(
    State(state): State<ServerStateRef>,
    GitHubWebhook(notification): GitHubWebhook,
) -> impl IntoResponse {
    match state.relay_queue.send(notification).await {
        Ok(_) => (StatusCode::OK, ""),
        Err(err) => {
            tracing::error!("Could not send webhook notification: {err:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}
