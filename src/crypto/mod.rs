//! Cryptographic utilities.

pub mod hash;

pub use hash::{sha256, Hash256};
