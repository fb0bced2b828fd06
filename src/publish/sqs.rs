//! Amazon SQS publisher.

use super::{Notification, Publisher};
use crate::error::PublishError;
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use tracing::debug;

/// Publishes notifications with SQS `SendMessage`.
///
/// The notification's destination is the queue URL and its body is the
/// message body. FIFO queues need a message group id.
///
/// # Examples
///
/// ```rust,no_run
/// use change_notify::publish::SqsPublisher;
///
/// # async fn example(client: aws_sdk_sqs::Client) {
/// let publisher = SqsPublisher::new(client).with_message_group_id("orders");
/// # }
/// ```
#[derive(Clone)]
pub struct SqsPublisher {
    client: Client,
    message_group_id: Option<String>,
}

impl SqsPublisher {
    /// Create a publisher from a configured SQS client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            message_group_id: None,
        }
    }

    /// Set the message group id sent with every message (FIFO queues).
    pub fn with_message_group_id(mut self, group: impl Into<String>) -> Self {
        self.message_group_id = Some(group.into());
        self
    }
}

#[async_trait]
impl Publisher for SqsPublisher {
    async fn publish(&self, notification: &Notification) -> Result<(), PublishError> {
        let output = self
            .client
            .send_message()
            .queue_url(&notification.destination)
            .message_body(&notification.body)
            .set_message_group_id(self.message_group_id.clone())
            .send()
            .await
            .map_err(|e| {
                let msg = format!("SQS SendMessage failed: {}", DisplayErrorContext(&e));
                if e.as_service_error().is_some() {
                    PublishError::Rejected(msg)
                } else {
                    PublishError::Transport(msg)
                }
            })?;

        debug!(
            queue = %notification.destination,
            message_id = output.message_id().unwrap_or_default(),
            "message sent to SQS"
        );
        Ok(())
    }

    fn name(&self) -> String {
        "sqs".to_string()
    }
}
