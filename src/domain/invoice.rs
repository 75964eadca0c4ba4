//! Invoice content and structural validation.

use thiserror::Error;

use super::Fingerprint;

/// Markers that must be present in the canonical invoice text.
///
/// The document marker is a bare heading; the labeled markers must also carry
/// a non-empty value somewhere after the label.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "INVOICE",
    "Invoice Number:",
    "Invoice Date:",
    "Bill To:",
    "Items:",
    "Total Amount:",
];

/// Structural validation failure, listing every missing field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid invoice structure; missing fields: {}", missing.join(", "))]
pub struct InvalidInvoice {
    pub missing: Vec<&'static str>,
}

/// Structurally validated invoice content.
///
/// Holds the exact text that was validated; the fingerprint is computed over
/// these bytes and no others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    text: String,
}

impl Invoice {
    /// Validate the required fields and wrap the canonical text.
    ///
    /// All missing fields are reported at once so a caller can correct the
    /// document in a single round trip.
    pub fn parse(text: &str) -> Result<Self, InvalidInvoice> {
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| !field_present(text, field))
            .collect();

        if !missing.is_empty() {
            return Err(InvalidInvoice { missing });
        }

        Ok(Self {
            text: text.to_string(),
        })
    }

    /// The exact byte sequence that was validated.
    pub fn canonical_text(&self) -> &str {
        &self.text
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(&self.text)
    }
}

/// A bare marker only needs to occur; a labeled marker must be followed by a
/// non-empty value.
fn field_present(text: &str, marker: &str) -> bool {
    match text.find(marker) {
        None => false,
        Some(idx) if marker.ends_with(':') => {
            !text[idx + marker.len()..].trim().is_empty()
        }
        Some(_) => true,
    }
}
