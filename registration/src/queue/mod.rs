//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The queue schema shared by producer and consumer
//! - A scoped broker connection that declares the queue
//! - The publisher used by the registration API
//!
//! ## Architecture
//!
//! ```text
//! API → user_registration_queue → Worker → MongoDB + welcome email
//! ```

pub mod broker;
pub mod publisher;
pub mod types;

pub use broker::Broker;
pub use publisher::{PublishError, Publisher, UserPublisher};
pub use types::{QueueMessage, USER_REGISTRATION_QUEUE};
