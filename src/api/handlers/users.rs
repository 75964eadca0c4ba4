//! Registration and login handlers.

use axum::extract::State;
use axum::Json;
use tracing::{debug, instrument};

use crate::api::error::ApiError;
use crate::api::types::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::server::AppState;

/// POST /api/v1/users/register - Register an invoice owner.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    debug!("registering user");

    let registered = state
        .auth
        .register(&request.username, &request.password_hash, &request.phone)
        .await?;

    Ok(Json(RegisterResponse { registered }))
}

/// POST /api/v1/users/login - Check credentials.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    debug!("logging in user");

    let success = state
        .auth
        .login(&request.username, &request.password_hash)
        .await?;

    Ok(Json(LoginResponse { success }))
}
