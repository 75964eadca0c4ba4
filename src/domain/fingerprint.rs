//! Invoice content fingerprints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{hash256_hex, sha256, Hash256};

/// Deterministic digest identifying an invoice's content.
///
/// The fingerprint is the join key between the ledger record and the mirror
/// record: identical content always yields an identical fingerprint. It is
/// computed over the exact bytes of the invoice text, so producers must agree
/// on one canonical textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(#[serde(with = "hash256_hex")] pub Hash256);

impl Fingerprint {
    /// Compute the fingerprint of canonical invoice text.
    ///
    /// No side effects; callers reject empty or structurally invalid input
    /// before invoking this.
    pub fn compute(content: &str) -> Self {
        Self(sha256(content.as_bytes()))
    }

    pub fn as_bytes(&self) -> &Hash256 {
        &self.0
    }

    /// Hex representation used at the API and storage boundaries.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a fingerprint from its hex representation.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let bytes: Hash256 = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
