//! RabbitMQ consumer loop using lapin.
//!
//! This module handles connecting to RabbitMQ, consuming from the
//! registration queue with manual acknowledgement, and feeding each
//! delivery to the [`MessageProcessor`] in turn. Deliveries are never
//! processed concurrently.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions},
    types::FieldTable,
    Channel,
};
use tracing::{error, info, warn};

use super::processor::{Acknowledger, MessageProcessor};
use crate::notify::Notifier;
use crate::queue::{Broker, QueueMessage, USER_REGISTRATION_QUEUE};
use crate::shutdown::shutdown_signal;
use crate::store::UserStore;
use crate::Config;

/// Unacknowledged deliveries allowed in flight per consumer.
pub const PREFETCH_COUNT: u16 = 1;

const CONSUMER_TAG: &str = "registration-worker";

#[async_trait]
impl Acknowledger for Channel {
    async fn ack(&self, delivery_tag: u64) -> Result<(), lapin::Error> {
        self.basic_ack(delivery_tag, BasicAckOptions::default()).await
    }

    async fn reject(&self, delivery_tag: u64) -> Result<(), lapin::Error> {
        self.basic_reject(delivery_tag, BasicRejectOptions { requeue: false })
            .await
    }
}

/// Run the registration consumer until shutdown.
///
/// This function:
/// 1. Connects to RabbitMQ and declares the queue (failure is fatal)
/// 2. Sets QoS prefetch to 1
/// 3. Subscribes with manual acknowledgement
/// 4. Processes deliveries one by one until SIGINT/SIGTERM
/// 5. Closes the broker connection on every exit path
pub async fn run<S: UserStore, N: Notifier>(
    config: &Config,
    processor: &MessageProcessor<S, N>,
) -> Result<()> {
    let broker = Broker::connect(&config.rabbitmq_url).await?;

    let result = consume(broker.channel(), processor).await;

    broker.close().await;

    result
}

async fn consume<S: UserStore, N: Notifier>(
    channel: &Channel,
    processor: &MessageProcessor<S, N>,
) -> Result<()> {
    channel
        .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
        .await
        .context("Failed to set QoS")?;

    info!(prefetch_count = PREFETCH_COUNT, "rabbitmq_qos_set");

    let mut consumer = channel
        .basic_consume(
            USER_REGISTRATION_QUEUE,
            CONSUMER_TAG,
            BasicConsumeOptions {
                no_ack: false,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to start consumer")?;

    info!(queue = USER_REGISTRATION_QUEUE, "rabbitmq_consumer_started");
    info!("worker_ready");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("worker_stopping");
                break;
            }
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let message = QueueMessage::from(delivery);

                        info!(
                            queue = USER_REGISTRATION_QUEUE,
                            delivery_tag = message.delivery_tag,
                            body_length = message.body.len(),
                            "rabbitmq_message_received"
                        );

                        processor.handle(channel, Some(&message)).await;
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "rabbitmq_delivery_error");
                    }
                    None => {
                        processor.handle(channel, None).await;
                        warn!("rabbitmq_consumer_closed");
                        return Err(anyhow!("consumer on {} was cancelled", USER_REGISTRATION_QUEUE));
                    }
                }
            }
        }
    }

    info!("worker_shutdown_complete");
    Ok(())
}
