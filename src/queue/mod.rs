//! Queue ingress: pull request notifications published to a durable queue by an upstream
//! webhook receiver.
//!
//! Messages are acknowledged as soon as they are received, before the relay handles them, so a
//! notification is relayed at most once even if the relay fails.
use std::future::Future;

use futures::{Stream, StreamExt};

use crate::relay::process::RelaySender;
use crate::relay::{Notification, NotificationError};

pub mod nats;

/// A single message received from the queue.
pub trait QueueDelivery {
    fn payload(&self) -> &[u8];

    /// Removes the message from the queue.
    fn ack(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Body of a queue message.
#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QueueNotification {
    repo_full_name: String,
    branch: String,
    pr_number: PrNumber,
    #[serde(default)]
    installation_id: Option<u64>,
}

/// Publishers send the pull request number either as a JSON number or as a string.
#[derive(serde::Deserialize, Debug)]
#[serde(untagged)]
enum PrNumber {
    Number(u64),
    Text(String),
}

#[derive(Debug, thiserror::Error)]
pub enum QueueMessageError {
    #[error("invalid message body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("invalid pull request number `{0}`")]
    PrNumber(String),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

pub fn parse_queue_message(body: &[u8]) -> Result<Notification, QueueMessageError> {
    let message: QueueNotification = serde_json::from_slice(body)?;
    let pr_number = match message.pr_number {
        PrNumber::Number(number) => number,
        PrNumber::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| QueueMessageError::PrNumber(text))?,
    };
    Ok(Notification::new(
        message.installation_id.map(Into::into),
        message.repo_full_name,
        message.branch,
        pr_number,
    )?)
}

/// Receives queue messages and forwards them to the relay process until the queue stream ends.
///
/// Every message is acknowledged before it is parsed and relayed. Messages that cannot be
/// acknowledged are skipped, malformed messages are logged and dropped.
pub async fn consume_queue<S, D>(mut deliveries: S, relay_tx: RelaySender) -> anyhow::Result<()>
where
    S: Stream<Item = anyhow::Result<D>> + Unpin,
    D: QueueDelivery,
{
    while let Some(delivery) = deliveries.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(error) => {
                tracing::error!("Could not receive queue message: {error:?}");
                continue;
            }
        };

        if let Err(error) = delivery.ack().await {
            tracing::error!("Could not acknowledge queue message, skipping it: {error:?}");
            continue;
        }

        let notification = match parse_queue_message(delivery.payload()) {
            Ok(notification) => notification,
            Err(error) => {
                tracing::error!(
                    "Dropping malformed queue message `{}`: {error}",
                    String::from_utf8_lossy(delivery.payload())
                );
                continue;
            }
        };
        tracing::info!("Received {notification} from queue");

        relay_tx
            .send(notification)
            .await
            .map_err(|_| anyhow::anyhow!("Relay process has ended"))?;
    }
    tracing::warn!("Queue message stream has ended");
    Ok(())
}
