//! Structured API error responses with stable error codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::coordinator::{MarkPaidError, SubmitError, VerifyError};
use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Machine-readable error codes, stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation (3xxx)
    /// Request body is malformed or empty
    InvalidRequestBody,
    /// Required invoice fields are missing
    InvalidInvoiceStructure,

    // Resource (4xxx)
    /// No mirror record for this invoice
    RecordNotFound,

    // Conflict (5xxx)
    /// Fingerprint already recorded on the ledger
    InvoiceAlreadyExists,

    // Upstream systems of record (8xxx)
    /// Ledger rejected the submission
    SubmissionFailed,
    /// Ledger unreachable or timed out
    LedgerUnavailable,
    /// Mirror store unreachable or timed out
    StoreUnavailable,
    /// Ledger committed but the mirror write is still pending
    PartialSuccess,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Numeric code, grouped by category.
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::InvalidInvoiceStructure => 3002,
            ErrorCode::RecordNotFound => 4001,
            ErrorCode::InvoiceAlreadyExists => 5001,
            ErrorCode::SubmissionFailed => 8001,
            ErrorCode::LedgerUnavailable => 8002,
            ErrorCode::StoreUnavailable => 8003,
            ErrorCode::PartialSuccess => 8004,
            ErrorCode::InternalError => 8999,
        }
    }

    /// HTTP status carried by this code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequestBody => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidInvoiceStructure => StatusCode::BAD_REQUEST,
            ErrorCode::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvoiceAlreadyExists => StatusCode::CONFLICT,
            ErrorCode::SubmissionFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::PartialSuccess => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error envelope returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::InvalidStructure(e) => {
                ApiError::new(ErrorCode::InvalidInvoiceStructure, e.to_string())
                    .with_details(serde_json::json!({ "missing": e.missing }))
            }
            SubmitError::AlreadyExists => ApiError::new(
                ErrorCode::InvoiceAlreadyExists,
                "Invoice already exists. Please submit a new invoice.",
            ),
            SubmitError::SubmissionFailed(LedgerError::Unavailable(msg)) => {
                ApiError::new(ErrorCode::LedgerUnavailable, msg)
            }
            SubmitError::SubmissionFailed(e) => {
                ApiError::new(ErrorCode::SubmissionFailed, e.to_string())
            }
            SubmitError::PartialSuccess { tx_ref, source } => ApiError::new(
                ErrorCode::PartialSuccess,
                format!("Ledger committed but the mirror write failed: {}", source),
            )
            .with_details(serde_json::json!({ "tx_ref": tx_ref.to_string() })),
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::EmptyContent => {
                ApiError::new(ErrorCode::InvalidRequestBody, "Invoice content is empty")
            }
            VerifyError::Ledger(LedgerError::Unavailable(msg)) => {
                ApiError::new(ErrorCode::LedgerUnavailable, msg)
            }
            VerifyError::Ledger(e) => ApiError::new(ErrorCode::SubmissionFailed, e.to_string()),
        }
    }
}

impl From<MarkPaidError> for ApiError {
    fn from(err: MarkPaidError) -> Self {
        match err {
            MarkPaidError::EmptyContent => {
                ApiError::new(ErrorCode::InvalidRequestBody, "Invoice content is empty")
            }
            MarkPaidError::RecordNotFound => ApiError::new(
                ErrorCode::RecordNotFound,
                "No mirror record exists for this invoice",
            ),
            MarkPaidError::Store(e) => ApiError::new(ErrorCode::StoreUnavailable, e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::new(ErrorCode::StoreUnavailable, err.to_string())
    }
}
