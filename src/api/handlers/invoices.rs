//! Invoice submission, verification, and payment handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, info, instrument};

use crate::api::error::ApiError;
use crate::api::types::{
    MarkPaidRequest, MarkPaidResponse, SubmitInvoiceRequest, SubmitInvoiceResponse,
    VerifyInvoiceRequest, VerifyInvoiceResponse,
};
use crate::coordinator;
use crate::server::AppState;

/// POST /api/v1/invoices - Notarize an invoice.
#[instrument(skip(state, request), fields(owner = %request.owner))]
pub async fn submit_invoice(
    State(state): State<AppState>,
    Json(request): Json<SubmitInvoiceRequest>,
) -> Result<(StatusCode, Json<SubmitInvoiceResponse>), ApiError> {
    info!("submitting invoice");

    let receipt = state
        .coordinator
        .submit(&coordinator::SubmitRequest {
            invoice: request.invoice,
            owner: request.owner,
            notify_destination: request.phone,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitInvoiceResponse {
            ok: true,
            tx_ref: receipt.tx_ref.to_string(),
            fingerprint: receipt.fingerprint.to_hex(),
            mirror_created: receipt.mirror_created,
        }),
    ))
}

/// POST /api/v1/invoices/verify - Ask the ledger about invoice content.
#[instrument(skip(state, request))]
pub async fn verify_invoice(
    State(state): State<AppState>,
    Json(request): Json<VerifyInvoiceRequest>,
) -> Result<Json<VerifyInvoiceResponse>, ApiError> {
    debug!("verifying invoice");

    let outcome = state.coordinator.verify(&request.invoice).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/v1/invoices/paid - Mark a mirrored invoice as paid.
#[instrument(skip(state, request), fields(owner = %request.owner))]
pub async fn mark_paid(
    State(state): State<AppState>,
    Json(request): Json<MarkPaidRequest>,
) -> Result<Json<MarkPaidResponse>, ApiError> {
    info!("marking invoice as paid");

    state
        .coordinator
        .mark_paid(&coordinator::MarkPaidRequest {
            invoice: request.invoice,
            owner: request.owner,
            notify_destination: request.phone,
        })
        .await?;

    Ok(Json(MarkPaidResponse { ok: true }))
}
