use anyhow::Context;
use async_nats::jetstream;
use async_nats::jetstream::consumer::PullConsumer;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::queue::QueueDelivery;

/// Durable pull consumer on a NATS JetStream stream.
pub struct NatsQueue {
    client: async_nats::Client,
    consumer: PullConsumer,
}

impl NatsQueue {
    /// Connects to `server_url` and binds to the durable `consumer_name` on `stream_name`,
    /// creating the consumer if it does not exist yet.
    pub async fn connect(
        server_url: &str,
        stream_name: &str,
        consumer_name: &str,
    ) -> anyhow::Result<Self> {
        let client = async_nats::connect(server_url)
            .await
            .with_context(|| format!("Could not connect to NATS server {server_url}"))?;
        let context = jetstream::new(client.clone());
        let stream = context
            .get_stream(stream_name)
            .await
            .with_context(|| format!("Could not load JetStream stream {stream_name}"))?;
        let consumer: PullConsumer = stream
            .get_or_create_consumer(
                consumer_name,
                jetstream::consumer::pull::Config {
                    durable_name: Some(consumer_name.to_string()),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("Could not create consumer {consumer_name}"))?;

        tracing::info!("Listening for messages on stream {stream_name} as {consumer_name}");
        Ok(Self { client, consumer })
    }

    pub async fn messages(&self) -> anyhow::Result<BoxStream<'static, anyhow::Result<NatsDelivery>>> {
        let messages = self
            .consumer
            .messages()
            .await
            .context("Could not subscribe to queue messages")?;
        Ok(messages
            .map(|message| message.map(NatsDelivery).map_err(anyhow::Error::from))
            .boxed())
    }

    /// Flushes pending acknowledgements and closes the connection.
    pub async fn close(self) -> anyhow::Result<()> {
        self.client
            .flush()
            .await
            .context("Could not flush NATS connection")?;
        tracing::info!("Queue connection closed");
        Ok(())
    }
}

pub struct NatsDelivery(jetstream::Message);

impl QueueDelivery for NatsDelivery {
    fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    async fn ack(&self) -> anyhow::Result<()> {
        self.0
            .ack()
            .await
            .map_err(|error| anyhow::anyhow!("Could not acknowledge message: {error}"))
    }
}
