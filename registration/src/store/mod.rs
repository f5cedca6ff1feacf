//! User persistence.
//!
//! [`UserStore`] is the port the worker depends on; [`MongoUserStore`] is
//! the production adapter. A duplicate email is not a failure: `save`
//! returns `Ok(None)` so callers can tell "already registered" apart from
//! "could not register".

pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user::UserPayload;

pub use mongo::MongoUserStore;

/// A persisted user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl UserRecord {
    /// New record with a fresh identity; both timestamps are set to now.
    pub fn new(user: &UserPayload) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Store failures other than a duplicate email.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("user store connection failed: {message}")]
    Connection { message: String },
    /// The write was attempted and refused or failed.
    #[error("user store write failed: {message}")]
    Write { message: String },
}

/// Port for persisting registered users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a validated user.
    ///
    /// Returns `Ok(None)` when a user with the same email already exists.
    async fn save(&self, user: &UserPayload) -> Result<Option<UserRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    fn payload() -> UserPayload {
        UserPayload {
            name: "Teste Jest".to_string(),
            email: "teste.jest@example.com".to_string(),
            phone: "987654321".to_string(),
        }
    }

    #[test]
    fn test_new_record_sets_identity_and_timestamps() {
        let record = UserRecord::new(&payload());
        assert_eq!(record.email, "teste.jest@example.com");
        assert_eq!(record.created_at, record.updated_at);
        assert_ne!(record.id, UserRecord::new(&payload()).id);
    }

    #[test]
    fn test_record_document_field_names() {
        let document = bson::to_document(&UserRecord::new(&payload())).unwrap();

        for key in ["_id", "name", "email", "phone", "createdAt", "updatedAt"] {
            assert!(document.contains_key(key), "missing {key}");
        }
        assert!(document.get_object_id("_id").is_ok());
        assert!(document.get_datetime("createdAt").is_ok());
    }
}
