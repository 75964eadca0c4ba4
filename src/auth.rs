//! Registration and login boundary.
//!
//! Thin gateway over the credential store. Passwords are hashed before they
//! reach this component; the hashing algorithm belongs to the caller's
//! credential library, not to this service.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::info;

use crate::store::{StoreError, UserStore};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Registration and login over the mirror store's user table.
pub struct AuthGateway {
    users: Arc<dyn UserStore>,
    store_timeout: Duration,
}

impl AuthGateway {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            users,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Register a user. Idempotent by inspection: an existing username or
    /// phone reports `Ok(false)` rather than an error.
    pub async fn register(
        &self,
        username: &str,
        password_hash: &str,
        phone: &str,
    ) -> Result<bool, StoreError> {
        let registered = match timeout(
            self.store_timeout,
            self.users.create_if_absent(username, password_hash, phone),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::Timeout(self.store_timeout)),
        };

        if registered {
            info!(username, "user registered");
        }

        Ok(registered)
    }

    /// Check a username/password-hash pair against the store.
    pub async fn login(&self, username: &str, password_hash: &str) -> Result<bool, StoreError> {
        let user = match timeout(
            self.store_timeout,
            self.users.find_by_credentials(username, password_hash),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::Timeout(self.store_timeout)),
        };

        Ok(user.is_some())
    }
}
