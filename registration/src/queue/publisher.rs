//! Async RabbitMQ publisher for registration messages.
//!
//! The publisher does not own a connection. It is handed the channel of an
//! already opened [`Broker`](super::Broker), and reports
//! [`PublishError::ChannelUnavailable`] instead of reconnecting when that
//! channel is missing or gone. Nothing is retried here.

use async_trait::async_trait;
use lapin::{options::BasicPublishOptions, BasicProperties, Channel};
use thiserror::Error;
use tracing::info;

use super::types::USER_REGISTRATION_QUEUE;
use crate::user::UserPayload;

/// Why a registration could not be enqueued.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("RabbitMQ channel is not connected")]
    ChannelUnavailable,
    #[error("failed to serialize user payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to publish registration message: {0}")]
    Broker(#[from] lapin::Error),
}

/// Enqueues validated registrations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserPublisher: Send + Sync {
    /// Publish one payload; all-or-nothing from the caller's perspective.
    async fn publish_user(&self, user: &UserPayload) -> Result<(), PublishError>;
}

/// Publishes persistent JSON messages to the registration queue.
pub struct Publisher {
    channel: Option<Channel>,
}

impl Publisher {
    /// Create a publisher on an established channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    /// A publisher with no channel; every publish fails.
    pub fn disconnected() -> Self {
        Self { channel: None }
    }

    fn channel(&self) -> Result<&Channel, PublishError> {
        match self.channel.as_ref() {
            Some(ch) if ch.status().connected() => Ok(ch),
            _ => Err(PublishError::ChannelUnavailable),
        }
    }
}

#[async_trait]
impl UserPublisher for Publisher {
    async fn publish_user(&self, user: &UserPayload) -> Result<(), PublishError> {
        let channel = self.channel()?;

        let body = serde_json::to_vec(user)?;

        channel
            .basic_publish(
                "",
                USER_REGISTRATION_QUEUE,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into()),
            )
            .await?
            .await?;

        info!(
            queue = USER_REGISTRATION_QUEUE,
            email = %user.email,
            body_length = body.len(),
            "rabbitmq_user_published"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnected_publisher_reports_channel_unavailable() {
        let publisher = Publisher::disconnected();
        let user = UserPayload {
            name: "Teste Jest".to_string(),
            email: "teste.jest@example.com".to_string(),
            phone: "987654321".to_string(),
        };

        let err = publisher.publish_user(&user).await.unwrap_err();
        assert!(matches!(err, PublishError::ChannelUnavailable));
    }
}
