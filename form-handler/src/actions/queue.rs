//! Queue action: publishes submissions to RabbitMQ.
//!
//! The publisher keeps one connection and channel for the whole process and
//! reconnects lazily when the channel drops.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::SubmissionAction;
use crate::forms::SanitizedSubmission;

/// Async RabbitMQ publisher with connection management.
#[derive(Clone)]
pub struct SubmissionPublisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    queue: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl SubmissionPublisher {
    /// Create a publisher. No connection is made until the first publish.
    pub fn new(url: String, queue: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                queue,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    pub fn queue(&self) -> &str {
        &self.inner.queue
    }

    /// Ensure we have a valid connection and channel.
    async fn ensure_connected(&self) -> Result<Channel> {
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Another task may have reconnected while we waited for the lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        info!("rabbitmq_publisher_connected");

        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        ch.queue_declare(
            &self.inner.queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare submission queue")?;

        info!(queue = %self.inner.queue, "rabbitmq_queue_declared");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Publish a submission to the queue.
    pub async fn publish(&self, submission: &SanitizedSubmission) -> Result<()> {
        let channel = self.ensure_connected().await?;

        let body = serde_json::to_vec(submission).context("Failed to serialize submission")?;
        let message_id = format!("{}-{}", submission.form_id(), submission.submitted_at());

        channel
            .basic_publish(
                "",
                &self.inner.queue,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into())
                    .with_message_id(message_id.clone().into()),
            )
            .await
            .context("Failed to publish to submission queue")?
            .await
            .context("Failed to confirm publish")?;

        info!(
            queue = %self.inner.queue,
            message_id = %message_id,
            body_length = body.len(),
            "rabbitmq_submission_published"
        );

        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

/// Publishes each submission with a [`SubmissionPublisher`].
#[derive(Clone)]
pub struct QueueAction {
    publisher: SubmissionPublisher,
}

impl QueueAction {
    pub fn new(publisher: SubmissionPublisher) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &SubmissionPublisher {
        &self.publisher
    }
}

impl SubmissionAction for QueueAction {
    fn name(&self) -> &'static str {
        "queue"
    }

    fn run(&self, submission: SanitizedSubmission) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.publisher.publish(&submission).await })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.publisher.close())
    }
}
