//! Message processing - the consumer side of the hand-off contract.
//!
//! Each delivery goes through parse → validate → persist → notify → ack,
//! strictly in sequence. Every failure rejects the message without
//! requeue; nothing is retried.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::notify::Notifier;
use crate::queue::QueueMessage;
use crate::store::UserStore;
use crate::user::validate_user;

/// Acknowledges or rejects deliveries on the channel they arrived on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self, delivery_tag: u64) -> Result<(), lapin::Error>;

    /// Reject without requeue.
    async fn reject(&self, delivery_tag: u64) -> Result<(), lapin::Error>;
}

/// Terminal state of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Saved, welcome sent (or attempted), acked.
    Registered,
    /// Email already on file; acked without notification.
    AlreadyRegistered,
    /// Unparsable, invalid or unsaveable; rejected without requeue.
    Rejected,
    /// No message was delivered; nothing acked or rejected.
    Ignored,
}

impl MessageOutcome {
    fn should_ack(self) -> bool {
        matches!(self, Self::Registered | Self::AlreadyRegistered)
    }
}

/// Processes registration messages against a store and a notifier.
pub struct MessageProcessor<S, N> {
    store: S,
    notifier: N,
}

impl<S: UserStore, N: Notifier> MessageProcessor<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    pub fn into_parts(self) -> (S, N) {
        (self.store, self.notifier)
    }

    /// Process one delivery and settle it on `channel`.
    ///
    /// An absent message (consumer cancelled by the broker) is logged and
    /// left alone, since there is nothing to settle.
    pub async fn handle<A: Acknowledger + ?Sized>(
        &self,
        channel: &A,
        message: Option<&QueueMessage>,
    ) -> MessageOutcome {
        let Some(message) = message else {
            warn!("rabbitmq_null_message_received");
            return MessageOutcome::Ignored;
        };

        let delivery_tag = message.delivery_tag;
        let outcome = self.process(message).await;

        if outcome.should_ack() {
            match channel.ack(delivery_tag).await {
                Ok(()) => info!(delivery_tag, outcome = ?outcome, "message_acked"),
                Err(e) => error!(delivery_tag, error = %e, "rabbitmq_ack_failed"),
            }
        } else {
            match channel.reject(delivery_tag).await {
                Ok(()) => warn!(delivery_tag, requeue = false, "message_rejected"),
                Err(e) => error!(delivery_tag, error = %e, "rabbitmq_reject_failed"),
            }
        }

        outcome
    }

    async fn process(&self, message: &QueueMessage) -> MessageOutcome {
        let delivery_tag = message.delivery_tag;

        let raw: Value = match serde_json::from_slice(&message.body) {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    delivery_tag,
                    error = %e,
                    body_length = message.body.len(),
                    "message_parse_failed"
                );
                return MessageOutcome::Rejected;
            }
        };

        let user = match validate_user(&raw) {
            Ok(user) => user,
            Err(e) => {
                error!(
                    delivery_tag,
                    field = %e.field(),
                    error = %e,
                    "message_validation_failed"
                );
                return MessageOutcome::Rejected;
            }
        };

        info!(
            delivery_tag,
            email = %user.email,
            redelivered = message.redelivered,
            "message_received"
        );

        match self.store.save(&user).await {
            Ok(Some(record)) => {
                info!(delivery_tag, email = %user.email, id = %record.id, "user_registered");
            }
            Ok(None) => {
                info!(delivery_tag, email = %user.email, "user_already_registered");
                return MessageOutcome::AlreadyRegistered;
            }
            Err(e) => {
                error!(delivery_tag, email = %user.email, error = %e, "user_persist_failed");
                return MessageOutcome::Rejected;
            }
        }

        self.notifier.send_welcome(&user).await;

        MessageOutcome::Registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;
    use crate::store::{MockUserStore, StoreError, UserRecord};
    use crate::user::UserPayload;
    use mockall::predicate::eq;

    fn user() -> UserPayload {
        UserPayload {
            name: "Usuário Teste".to_string(),
            email: "teste@dominio.com".to_string(),
            phone: "987654321".to_string(),
        }
    }

    fn message_for(tag: u64, user: &UserPayload) -> QueueMessage {
        QueueMessage::new(tag, serde_json::to_vec(user).unwrap())
    }

    fn acking_channel(tag: u64) -> MockAcknowledger {
        let mut channel = MockAcknowledger::new();
        channel.expect_ack().with(eq(tag)).times(1).returning(|_| Ok(()));
        channel.expect_reject().never();
        channel
    }

    fn rejecting_channel(tag: u64) -> MockAcknowledger {
        let mut channel = MockAcknowledger::new();
        channel.expect_reject().with(eq(tag)).times(1).returning(|_| Ok(()));
        channel.expect_ack().never();
        channel
    }

    fn untouched_store() -> MockUserStore {
        let mut store = MockUserStore::new();
        store.expect_save().never();
        store
    }

    fn untouched_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_send_welcome().never();
        notifier
    }

    #[tokio::test]
    async fn test_valid_message_is_saved_notified_and_acked() {
        let expected = user();

        let mut store = MockUserStore::new();
        let saved = expected.clone();
        store
            .expect_save()
            .withf(move |u| *u == saved)
            .times(1)
            .returning(|u| Ok(Some(UserRecord::new(u))));

        let mut notifier = MockNotifier::new();
        let welcomed = expected.clone();
        notifier
            .expect_send_welcome()
            .withf(move |u| *u == welcomed)
            .times(1)
            .return_const(());

        let processor = MessageProcessor::new(store, notifier);
        let outcome = processor
            .handle(&acking_channel(1), Some(&message_for(1, &expected)))
            .await;

        assert_eq!(outcome, MessageOutcome::Registered);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let processor = MessageProcessor::new(untouched_store(), untouched_notifier());
        let message = QueueMessage::new(7, b"{not json".to_vec());

        let outcome = processor.handle(&rejecting_channel(7), Some(&message)).await;

        assert_eq!(outcome, MessageOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected() {
        let processor = MessageProcessor::new(untouched_store(), untouched_notifier());
        let message = QueueMessage::new(
            2,
            br#"{"name":"Teste","email":"email.com","phone":"123"}"#.to_vec(),
        );

        let outcome = processor.handle(&rejecting_channel(2), Some(&message)).await;

        assert_eq!(outcome, MessageOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_acked_without_notification() {
        let mut store = MockUserStore::new();
        store.expect_save().times(1).returning(|_| Ok(None));

        let processor = MessageProcessor::new(store, untouched_notifier());
        let outcome = processor
            .handle(&acking_channel(5), Some(&message_for(5, &user())))
            .await;

        assert_eq!(outcome, MessageOutcome::AlreadyRegistered);
    }

    #[tokio::test]
    async fn test_store_failure_is_rejected_without_notification() {
        let mut store = MockUserStore::new();
        store.expect_save().times(1).returning(|_| {
            Err(StoreError::Write {
                message: "MongoDB save failed".to_string(),
            })
        });

        let processor = MessageProcessor::new(store, untouched_notifier());
        let outcome = processor
            .handle(&rejecting_channel(3), Some(&message_for(3, &user())))
            .await;

        assert_eq!(outcome, MessageOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_absent_message_touches_nothing() {
        let mut channel = MockAcknowledger::new();
        channel.expect_ack().never();
        channel.expect_reject().never();

        let processor = MessageProcessor::new(untouched_store(), untouched_notifier());
        let outcome = processor.handle(&channel, None).await;

        assert_eq!(outcome, MessageOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_ack_failure_is_logged_not_raised() {
        let mut store = MockUserStore::new();
        store.expect_save().returning(|_| Ok(None));

        let mut channel = MockAcknowledger::new();
        channel
            .expect_ack()
            .times(1)
            .returning(|_| Err(lapin::Error::ChannelsLimitReached));
        channel.expect_reject().never();

        let processor = MessageProcessor::new(store, untouched_notifier());
        let outcome = processor
            .handle(&channel, Some(&message_for(9, &user())))
            .await;

        assert_eq!(outcome, MessageOutcome::AlreadyRegistered);
    }
}
