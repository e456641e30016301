//! Ingest event handler implementation

use std::collections::HashMap;
use std::sync::Arc;

use super::EventHandler;
use crate::config::Config;
use crate::context::MessageContext;
use crate::messaging::{DeadLetter, MessageBroker, MessageStream, ReceivedMessage};
use async_trait::async_trait;
use domain_ingest::{
    ClientFactory, ConfigKey, HttpClientFactory, IngestError, IngestionHandler,
    InvocationContext,
};
use eyre::{Result, WrapErr};
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{Level, debug, error, info, instrument, warn};

/// Where messages come from and where results go
#[derive(Debug, Clone)]
pub struct Routing {
    pub input_subject: String,
    pub output_subject: Option<String>,
    pub dlq_subject: Option<String>,
    pub queue_group: String,
}

impl Routing {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_subject: config.input_subject.clone(),
            output_subject: config.output_subject.clone(),
            dlq_subject: config.dlq_subject.clone(),
            queue_group: config.queue_group.clone(),
        }
    }
}

/// Runs every message on the input subject through the ingestion pipeline
pub struct IngestEventHandler<B: MessageBroker, F: ClientFactory = HttpClientFactory> {
    broker: Arc<B>,
    ingestion: IngestionHandler<F>,
    user_config: Arc<HashMap<ConfigKey, String>>,
    routing: Routing,
    limiter: Arc<Semaphore>,
}

impl<B: MessageBroker, F: ClientFactory + 'static> IngestEventHandler<B, F> {
    pub fn new(
        broker: Arc<B>,
        ingestion: IngestionHandler<F>,
        user_config: HashMap<ConfigKey, String>,
        routing: Routing,
        max_concurrent_handlers: usize,
    ) -> Self {
        Self {
            broker,
            ingestion,
            user_config: Arc::new(user_config),
            routing,
            limiter: Arc::new(Semaphore::new(max_concurrent_handlers.max(1))),
        }
    }

    /// Consume the input subject until the subscription closes or `shutdown`
    /// flips to `true`
    ///
    /// Each message is handled on its own task; at most
    /// `max_concurrent_handlers` run at once. On shutdown no further messages
    /// are pulled and in-flight ingestions run to completion before this
    /// returns.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut stream = self
            .broker
            .queue_subscribe(&self.routing.input_subject, &self.routing.queue_group)
            .await?;

        info!(
            subject = %self.routing.input_subject,
            queue_group = %self.routing.queue_group,
            "Ingest event handler started"
        );

        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping intake");
                break;
            }

            let msg = tokio::select! {
                msg = stream.next() => match msg {
                    Some(msg) => msg,
                    None => {
                        warn!(subject = %self.routing.input_subject, "Subscription closed");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    // A dropped sender can never signal again; treat it as shutdown
                    if changed.is_err() {
                        info!("Shutdown sender dropped, stopping intake");
                        break;
                    }
                    continue;
                }
            };

            let permit = self
                .limiter
                .clone()
                .acquire_owned()
                .await
                .wrap_err("Handler semaphore closed")?;

            let this = Arc::clone(&self);
            tasks.spawn(async move {
                let _permit = permit;
                this.handle(msg).await
            });

            while let Some(joined) = tasks.try_join_next() {
                log_task_result(joined);
            }
        }

        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "Draining in-flight messages");
        }
        while let Some(joined) = tasks.join_next().await {
            log_task_result(joined);
        }

        info!("Ingest event handler stopped");
        Ok(())
    }

    #[instrument(skip(self, msg), fields(subject = %msg.subject))]
    async fn handle_message(&self, msg: ReceivedMessage) -> Result<()> {
        let ctx = MessageContext::for_message(&msg, self.user_config.clone());

        let result = match std::str::from_utf8(&msg.payload) {
            Ok(input) => self.ingestion.handle(input, &ctx).await,
            Err(e) => {
                let err = IngestError::Parse(format!("payload is not UTF-8: {}", e));
                ctx.log(Level::ERROR, &format!("Error parsing input: {}", err));
                Err(err)
            }
        };

        match result {
            Ok(output) => self.publish_output(&msg, output.as_bytes()).await,
            Err(err) => self.dead_letter(&msg, &ctx, &err).await,
        }
    }

    async fn publish_output(&self, msg: &ReceivedMessage, output: &[u8]) -> Result<()> {
        let target = msg.reply.as_ref().or(self.routing.output_subject.as_ref());

        match target {
            Some(subject) => self.broker.publish_raw(subject, output).await,
            None => {
                debug!("No output subject configured, dropping result");
                Ok(())
            }
        }
    }

    async fn dead_letter(
        &self,
        msg: &ReceivedMessage,
        ctx: &MessageContext,
        err: &IngestError,
    ) -> Result<()> {
        warn!(
            message_id = %ctx.invocation_id(),
            stage = %err.stage(),
            error = %err,
            "Ingestion failed"
        );

        let Some(dlq_subject) = &self.routing.dlq_subject else {
            return Ok(());
        };

        let entry = DeadLetter {
            message_id: ctx.invocation_id(),
            subject: msg.subject.clone(),
            stage: err.stage().to_string(),
            error: err.to_string(),
            payload: String::from_utf8_lossy(&msg.payload).into_owned(),
            failed_at: chrono::Utc::now(),
        };

        self.broker
            .publish(dlq_subject, &entry)
            .await
            .wrap_err("Failed to publish dead letter")
    }
}

fn log_task_result(joined: std::result::Result<Result<()>, JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Failed to handle message"),
        Err(e) if e.is_panic() => error!(error = %e, "Ingestion task panicked"),
        Err(e) => error!(error = %e, "Ingestion task was cancelled"),
    }
}

#[async_trait]
impl<B: MessageBroker, F: ClientFactory + 'static> EventHandler for IngestEventHandler<B, F> {
    async fn handle(&self, message: ReceivedMessage) -> Result<()> {
        self.handle_message(message).await
    }
}
