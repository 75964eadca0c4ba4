//! Mirror records and ledger attestations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::hash::{hash256_hex, Hash256};

use super::Fingerprint;

/// Reference to the ledger transaction that recorded a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRef(#[serde(with = "hash256_hex")] pub Hash256);

impl TxRef {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes: Hash256 = hex::decode(s).ok()?.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Payment lifecycle of a mirrored invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Accepted by the ledger, not yet paid.
    Valid,
    /// Marked as paid by the owner.
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Valid => "valid",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "valid" => Some(InvoiceStatus::Valid),
            "paid" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable off-chain record tracking submission and payment status.
///
/// Created only after the ledger has accepted the fingerprint; the mirror may
/// lag the ledger but must never lead it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub id: Uuid,
    pub owner: String,
    pub fingerprint: Fingerprint,
    pub status: InvoiceStatus,
    pub tx_ref: TxRef,
    pub created_at: DateTime<Utc>,
}

/// What the ledger attests about a recorded fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAttestation {
    /// Identity the ledger recorded as the submitter.
    pub submitter: String,
    /// Ledger acceptance time.
    pub accepted_at: DateTime<Utc>,
    /// Validity flag carried by the registry for this fingerprint.
    pub valid: bool,
}
