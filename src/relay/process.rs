use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::relay::{relay, Notification, RelayContext, RelayOutcome};
use crate::utils::logging::LogError;

pub type RelaySender = mpsc::Sender<Notification>;

pub struct RelayProcess {
    pub tx: RelaySender,
    pub process: Pin<Box<dyn Future<Output = ()> + Send>>,
}

/// Creates a future that continuously receives notifications and relays each of them in its
/// own task.
///
/// The future resolves once all senders are dropped and every in-flight notification has been
/// handled.
pub fn create_relay_process(ctx: RelayContext) -> RelayProcess {
    let (tx, rx) = mpsc::channel::<Notification>(1024);

    let service = consume_notifications(Arc::new(ctx), rx);
    RelayProcess {
        tx,
        process: Box::pin(service),
    }
}

async fn consume_notifications(ctx: Arc<RelayContext>, mut rx: mpsc::Receiver<Notification>) {
    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            notification = rx.recv() => {
                let Some(notification) = notification else {
                    break;
                };
                let ctx = ctx.clone();
                let span = tracing::info_span!(
                    "Notification",
                    repo = notification.source_repo(),
                    pr = %notification.pr_number()
                );
                tasks.spawn(
                    async move {
                        tracing::debug!("Received notification: {notification:?}");
                        handle_notification(&ctx, notification).await
                    }
                    .instrument(span),
                );
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                log_task_result(result);
            }
        }
    }

    while let Some(result) = tasks.join_next().await {
        log_task_result(result);
    }
}

/// Returns `None` if relaying has failed with an error, which is logged in the current span.
async fn handle_notification(
    ctx: &RelayContext,
    notification: Notification,
) -> Option<RelayOutcome> {
    match relay(ctx, notification).await {
        Ok(outcome) => Some(outcome),
        Err(error) => {
            tracing::Span::current().log_error(error);
            None
        }
    }
}

fn log_task_result(result: Result<Option<RelayOutcome>, tokio::task::JoinError>) {
    match result {
        Ok(outcome) => tracing::debug!("Notification handled: {outcome:?}"),
        Err(error) => tracing::error!("Relay task has failed: {error:?}"),
    }
}
