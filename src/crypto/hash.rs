//! Deterministic hashing.
//!
//! Invoice fingerprints commit to the exact byte sequence of the canonical
//! invoice text. The digest must reproduce bit-for-bit across
//! reimplementations, so there is no re-serialization step here: callers hash
//! the bytes as received.

use sha2::{Digest, Sha256};

/// 32-byte SHA-256 hash
pub type Hash256 = [u8; 32];

/// Hash raw bytes with SHA-256
pub fn sha256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Serde module for serializing Hash256 as hex strings
pub mod hash256_hex {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_deterministic() {
        let a = sha256(b"INVOICE\nInvoice Number: 42");
        let b = sha256(b"INVOICE\nInvoice Number: 42");
        assert_eq!(a, b);
    }

    #[test]
    fn test_sha256_sensitive_to_single_byte() {
        let a = sha256(b"Total Amount: $100");
        let b = sha256(b"Total Amount: $101");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string
        let digest = sha256(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
