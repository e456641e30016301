//! NATS implementation of the MessageBroker trait

use super::{MESSAGE_ID_HEADER, MessageBroker, MessageStream, ReceivedMessage};
use async_nats::{Client, Subscriber};
use async_trait::async_trait;
use core_config::nats::NatsConfig;
use eyre::{Result, WrapErr};
use tracing::{debug, instrument};

/// NATS-based message broker implementation
pub struct NatsBroker {
    client: Client,
}

impl NatsBroker {
    /// Connect to the NATS server described by `config`
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        let mut options = async_nats::ConnectOptions::new();
        if let Some(name) = &config.client_name {
            options = options.name(name);
        }

        let client = options
            .connect(config.url.as_str())
            .await
            .wrap_err_with(|| format!("Failed to connect to NATS at {}", config.url))?;

        Ok(Self { client })
    }

    /// Flush pending publishes before shutdown
    pub async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .wrap_err("Failed to flush NATS client")
    }
}

#[async_trait]
impl MessageBroker for NatsBroker {
    #[instrument(skip(self, payload), fields(subject = %subject, bytes = payload.len()))]
    async fn publish_raw(&self, subject: &str, payload: &[u8]) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload.to_vec().into())
            .await
            .wrap_err("Failed to publish message")?;

        debug!("Published message");
        Ok(())
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<Box<dyn MessageStream>> {
        let subscriber = self
            .client
            .queue_subscribe(subject.to_string(), queue_group.to_string())
            .await
            .wrap_err_with(|| format!("Failed to queue subscribe to {}", subject))?;

        Ok(Box::new(NatsMessageStream { subscriber }))
    }
}

/// NATS message stream wrapper
struct NatsMessageStream {
    subscriber: Subscriber,
}

#[async_trait]
impl MessageStream for NatsMessageStream {
    async fn next(&mut self) -> Option<ReceivedMessage> {
        use futures::StreamExt;

        self.subscriber.next().await.map(|msg| ReceivedMessage {
            message_id: msg
                .headers
                .as_ref()
                .and_then(|h| h.get(MESSAGE_ID_HEADER))
                .map(|v| v.as_str().to_string()),
            subject: msg.subject.to_string(),
            payload: msg.payload.to_vec(),
            reply: msg.reply.map(|s| s.to_string()),
        })
    }
}
