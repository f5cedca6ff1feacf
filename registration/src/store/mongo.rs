//! MongoDB adapter for [`UserStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::{
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use tracing::{error, info, warn};

use super::{StoreError, UserRecord, UserStore};
use crate::config::redact_url;
use crate::user::UserPayload;

/// Database used when the URI names none.
pub const DEFAULT_DATABASE: &str = "userdb";

/// Collection holding registered users.
pub const USERS_COLLECTION: &str = "users";

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// User store backed by a MongoDB collection with a unique email index.
pub struct MongoUserStore {
    client: Client,
    users: Collection<UserRecord>,
}

impl MongoUserStore {
    /// Connect, verify the server answers, and ensure the email index.
    ///
    /// The driver connects lazily, so the ping is what makes an unreachable
    /// server a startup failure.
    pub async fn connect(uri: &str) -> Result<Self> {
        info!(uri = %redact_url(uri), "mongodb_connecting");

        let client = Client::with_uri_str(uri)
            .await
            .context("Invalid MongoDB URI")?;

        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

        database
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to connect to MongoDB")?;

        info!(database = %database.name(), "mongodb_connected");

        let users = database.collection::<UserRecord>(USERS_COLLECTION);

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        users
            .create_index(email_index)
            .await
            .context("Failed to create unique email index")?;

        info!(collection = USERS_COLLECTION, "mongodb_email_index_ready");

        Ok(Self { client, users })
    }

    /// Shut the client down, waiting for in-flight operations.
    pub async fn close(self) {
        self.client.shutdown().await;
        info!("mongodb_connection_closed");
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn save(&self, user: &UserPayload) -> Result<Option<UserRecord>, StoreError> {
        let record = UserRecord::new(user);

        match self.users.insert_one(&record).await {
            Ok(_) => {
                info!(email = %record.email, id = %record.id, "mongodb_user_saved");
                Ok(Some(record))
            }
            Err(e) if is_duplicate_key(&e) => {
                warn!(email = %user.email, "mongodb_user_already_exists");
                Ok(None)
            }
            Err(e) => {
                error!(email = %user.email, error = %e, "mongodb_user_save_failed");
                Err(store_error(&e))
            }
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

fn store_error(err: &MongoError) -> StoreError {
    let message = err.to_string();
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => StoreError::Connection { message },
        _ => StoreError::Write { message },
    }
}
