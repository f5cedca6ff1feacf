//! Scoped RabbitMQ connection shared by both services.
//!
//! A [`Broker`] is opened once at startup, handed to whatever needs the
//! channel, and closed explicitly on the way out. Close errors are logged,
//! never raised.

use anyhow::{Context, Result};
use lapin::{
    options::QueueDeclareOptions, types::FieldTable, Channel, Connection, ConnectionProperties,
};
use tracing::{info, warn};

use super::types::USER_REGISTRATION_QUEUE;
use crate::config::redact_url;

/// An open connection and channel with the registration queue declared.
pub struct Broker {
    connection: Connection,
    channel: Channel,
}

impl Broker {
    /// Connect, open a channel and declare the durable registration queue.
    ///
    /// The declaration is idempotent, so either service may start first.
    pub async fn connect(url: &str) -> Result<Self> {
        info!(url = %redact_url(url), "rabbitmq_connecting");

        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        info!("rabbitmq_connected");

        let channel = connection
            .create_channel()
            .await
            .context("Failed to create channel")?;

        info!("rabbitmq_channel_created");

        channel
            .queue_declare(
                USER_REGISTRATION_QUEUE,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("Failed to declare queue")?;

        info!(queue = USER_REGISTRATION_QUEUE, "rabbitmq_queue_declared");

        Ok(Self {
            connection,
            channel,
        })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Close the channel, then the connection.
    pub async fn close(self) {
        if let Err(e) = self.channel.close(200, "Normal shutdown").await {
            warn!(error = %e, "rabbitmq_channel_close_error");
        } else {
            info!("rabbitmq_channel_closed");
        }

        if let Err(e) = self.connection.close(200, "Normal shutdown").await {
            warn!(error = %e, "rabbitmq_connection_close_error");
        } else {
            info!("rabbitmq_connection_closed");
        }
    }
}
