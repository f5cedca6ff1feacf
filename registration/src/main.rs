//! Registration Worker - RabbitMQ consumer for user registrations.
//!
//! This worker consumes the user_registration_queue one message at a time,
//! re-validates each payload, persists it to MongoDB and sends a welcome
//! email. Any startup failure exits non-zero so a supervisor can restart it.

use anyhow::Result;
use tracing::info;

use registration::config::redact_url;
use registration::{telemetry, Config, MessageProcessor, MongoUserStore, SmtpNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("worker_starting");

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        rabbitmq_url = %redact_url(&config.rabbitmq_url),
        mongo_uri = %redact_url(&config.mongo_uri),
        smtp_host = %config.smtp.host,
        smtp_credentials_set = config.smtp.credentials().is_some(),
        "config_loaded"
    );

    let store = MongoUserStore::connect(&config.mongo_uri).await?;
    let notifier = SmtpNotifier::launch(&config.smtp).await;
    let processor = MessageProcessor::new(store, notifier);

    let result = registration::worker::run(&config, &processor).await;

    let (store, _notifier) = processor.into_parts();
    store.close().await;

    result
}
