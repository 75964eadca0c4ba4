//! Mutable mirror storage.
//!
//! The mirror tracks submission/payment state keyed by fingerprint. It is
//! created only after ledger acceptance and may lag the ledger, never lead
//! it. Absent records are normal outcomes here, not errors; only transport
//! failures surface as [`StoreError`].

pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Fingerprint, MirrorRecord, TxRef};

pub use postgres::{PgRecordStore, PgUserStore};

/// Store transport failures, distinct from the normal absent outcomes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or query transport failure. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// The operation did not complete within its deadline. Retryable.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Persisted mirror of ledger-accepted invoices, keyed by fingerprint.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the mirror row for a ledger-accepted fingerprint.
    ///
    /// Idempotent: when a row already exists it is left untouched and
    /// `Ok(false)` is returned. This is what makes the coordinator safe to
    /// retry after a crash between ledger acceptance and the mirror write.
    async fn create_if_absent(
        &self,
        fingerprint: &Fingerprint,
        owner: &str,
        tx_ref: &TxRef,
    ) -> Result<bool, StoreError>;

    /// Transition the record to Paid.
    ///
    /// Returns `Ok(false)` when no matching record exists; repeating on a
    /// Paid record keeps it Paid and reports `Ok(true)`.
    async fn mark_paid(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError>;

    /// Fetch the mirror record for a fingerprint.
    async fn find(&self, fingerprint: &Fingerprint) -> Result<Option<MirrorRecord>, StoreError>;
}

/// Registered invoice owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Credential storage behind the auth boundary.
///
/// Passwords are hashed before they reach this trait; implementations only
/// ever see and compare hashes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register a user unless the username or phone is already taken.
    /// Returns `Ok(false)` when either is.
    async fn create_if_absent(
        &self,
        username: &str,
        password_hash: &str,
        phone: &str,
    ) -> Result<bool, StoreError>;

    /// Look up a user by exact username/password-hash match.
    async fn find_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, StoreError>;
}
