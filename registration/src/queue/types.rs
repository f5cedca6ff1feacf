//! Queue message types.
//!
//! The message body on `user_registration_queue` is the JSON encoding of
//! [`UserPayload`](crate::user::UserPayload), published persistent.

/// Queue name for user registrations.
pub const USER_REGISTRATION_QUEUE: &str = "user_registration_queue";

/// A delivered message, detached from the broker client.
///
/// The worker turns every broker delivery into one of these before handing
/// it to the message processor, so processing can be exercised without a
/// live broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Broker-assigned tag used to ack or reject this delivery
    pub delivery_tag: u64,
    /// Whether the broker has delivered this message before
    pub redelivered: bool,
    /// Raw message body
    pub body: Vec<u8>,
}

impl QueueMessage {
    pub fn new(delivery_tag: u64, body: impl Into<Vec<u8>>) -> Self {
        Self {
            delivery_tag,
            redelivered: false,
            body: body.into(),
        }
    }
}

impl From<lapin::message::Delivery> for QueueMessage {
    fn from(delivery: lapin::message::Delivery) -> Self {
        Self {
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            body: delivery.data,
        }
    }
}
