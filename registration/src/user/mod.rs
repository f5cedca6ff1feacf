//! The registration payload and the validation gate both services share.
//!
//! The producer validates before publishing and the consumer validates again
//! before persisting; both call [`validate_user`] so the two boundaries can
//! never disagree about what a valid registration is.

pub mod validation;

use serde::{Deserialize, Serialize};

pub use validation::{validate_user, ValidationError, ValidationReason};

/// A user submission as it travels through the queue.
///
/// Serialized field order (`name`, `email`, `phone`) is the canonical
/// message encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
}
