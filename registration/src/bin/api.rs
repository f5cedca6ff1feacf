//! Registration API - HTTP producer for user registrations.
//!
//! This binary provides a thin web server that:
//! - Validates registration submissions
//! - Enqueues valid ones to RabbitMQ
//! - Answers 202 once the message is on the queue
//!
//! Persistence and notification happen in the registration worker.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use registration::config::redact_url;
use registration::shutdown::shutdown_signal;
use registration::web::{router, AppState};
use registration::{telemetry, Broker, Config, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("api_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        rabbitmq_url = %redact_url(&config.rabbitmq_url),
        "config_loaded"
    );

    // Broker failure at startup is fatal
    let broker = Broker::connect(&config.rabbitmq_url).await?;

    let state = AppState::new(Publisher::new(broker.channel().clone()));
    info!("rabbitmq_publisher_created");

    let result = serve(config.port, state).await;

    broker.close().await;

    info!("api_shutdown_complete");

    result
}

async fn serve(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "api_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("api_shutting_down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
