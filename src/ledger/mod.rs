//! Ledger access.
//!
//! The ledger is the sole arbiter of duplicate detection and of submission
//! identity/timestamp. The coordinator never re-implements that logic
//! locally: after a partial failure the mirror can fall out of sync with the
//! ledger, so only the ledger's answer counts.

pub mod eth;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::domain::{Fingerprint, LedgerAttestation, TxRef};

pub use eth::{EthLedgerClient, LedgerConfig};

/// Errors from ledger submission and queries.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The ledger already holds this fingerprint. Expected during duplicate
    /// submission, not a failure.
    #[error("fingerprint already recorded on the ledger")]
    Duplicate,

    /// Network failure or timeout reaching the ledger. Retryable.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Any other ledger-side rejection (malformed input, insufficient
    /// authorization, reverted call).
    #[error("ledger rejected the submission: {0}")]
    Rejected(String),
}

/// Client for the append-only invoice registry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Record a fingerprint on the ledger.
    ///
    /// Fails with [`LedgerError::Duplicate`] when the ledger already holds
    /// the fingerprint; the registry enforces this, not the caller.
    async fn submit(&self, fingerprint: &Fingerprint, submitter: &str)
        -> Result<TxRef, LedgerError>;

    /// Look up a fingerprint. Never mutates; absence is `Ok(None)`, not an
    /// error.
    async fn verify(&self, fingerprint: &Fingerprint)
        -> Result<Option<LedgerAttestation>, LedgerError>;
}
