//! User registration pipeline.
//!
//! This library provides shared modules for the two binaries:
//! - `registration-api`: validates submissions and enqueues them
//! - `registration-worker`: consumes the queue, persists users and sends
//!   the welcome email
//!
//! ## Architecture
//!
//! ```text
//! POST /api/users → API → user_registration_queue → Worker → MongoDB
//!                                                          → SMTP welcome email
//! ```

pub mod config;
pub mod notify;
pub mod queue;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod user;
pub mod web;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use notify::{Notifier, SmtpNotifier};
pub use queue::{Broker, PublishError, Publisher, QueueMessage, UserPublisher, USER_REGISTRATION_QUEUE};
pub use store::{MongoUserStore, StoreError, UserRecord, UserStore};
pub use user::{validate_user, UserPayload, ValidationError};
pub use web::AppState;
pub use worker::{MessageOutcome, MessageProcessor};
