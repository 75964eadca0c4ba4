//! Request and response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinator::VerifyOutcome;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitInvoiceRequest {
    /// Canonical invoice text.
    pub invoice: String,
    /// Owner identity recorded on the mirror.
    pub owner: String,
    /// Notification destination.
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitInvoiceResponse {
    pub ok: bool,
    pub tx_ref: String,
    pub fingerprint: String,
    /// False when the mirror row already existed (retry after a partial
    /// failure).
    pub mirror_created: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyInvoiceRequest {
    pub invoice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    Valid,
    Invalid,
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyInvoiceResponse {
    pub status: VerifyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl From<VerifyOutcome> for VerifyInvoiceResponse {
    fn from(outcome: VerifyOutcome) -> Self {
        match outcome {
            VerifyOutcome::Valid {
                submitter,
                accepted_at,
            } => Self {
                status: VerifyStatus::Valid,
                submitter: Some(submitter),
                accepted_at: Some(accepted_at),
            },
            VerifyOutcome::Invalid => Self {
                status: VerifyStatus::Invalid,
                submitter: None,
                accepted_at: None,
            },
            VerifyOutcome::NotFound => Self {
                status: VerifyStatus::NotFound,
                submitter: None,
                accepted_at: None,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkPaidRequest {
    pub invoice: String,
    pub owner: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPaidResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    /// Hashed before it reaches this service.
    pub password_hash: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub registered: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&VerifyStatus::NotFound).unwrap(),
            r#""not_found""#
        );
    }

    #[test]
    fn test_not_found_response_omits_attestation_fields() {
        let response = VerifyInvoiceResponse::from(VerifyOutcome::NotFound);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"status": "not_found"}));
    }
}
