//! Welcome notifications.
//!
//! Notification is best-effort: [`Notifier::send_welcome`] cannot fail.
//! Implementations log and swallow their own errors, so a missed welcome
//! email never fails a registration.

pub mod smtp;

use async_trait::async_trait;

use crate::user::UserPayload;

pub use smtp::{NotificationFailure, SmtpNotifier};

/// Sends the welcome message for a newly registered user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome(&self, user: &UserPayload);
}
