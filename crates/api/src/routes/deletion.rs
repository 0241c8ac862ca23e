//! Account deletion (right to erasure)
//!
//! Deletion is soft for the configured grace period. The account can be
//! recovered until its scheduled deletion time, after which the worker purges
//! it.

use axum::{extract::State, Extension, Json};
use retirezest_entitlement::DeletionState;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{auth::AuthAccount, error::ApiResult, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteAccountRequest {
    /// Optional free-text reason shown to support
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletionResponse {
    pub deletion: DeletionState,
    pub message: String,
}

/// Deletion state of the caller's account
pub async fn get_deletion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> ApiResult<Json<DeletionState>> {
    Ok(Json(state.engine.deletion_state(auth.account_id).await?))
}

/// Schedule the caller's account for deletion
pub async fn request_deletion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
    body: Option<Json<DeleteAccountRequest>>,
) -> ApiResult<Json<DeletionResponse>> {
    let reason = body.and_then(|Json(req)| req.reason);
    let account = state
        .engine
        .request_soft_delete(auth.account_id, reason, OffsetDateTime::now_utc())
        .await?;

    let days = state.engine.config().deletion_grace_period.whole_days();
    Ok(Json(DeletionResponse {
        deletion: DeletionState::of(&account),
        message: format!(
            "Your account will be permanently deleted in {} days. Log in before then to cancel.",
            days
        ),
    }))
}

/// Cancel a pending deletion
pub async fn recover(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> ApiResult<Json<DeletionResponse>> {
    let account = state
        .engine
        .recover_account(auth.account_id, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(DeletionResponse {
        deletion: DeletionState::of(&account),
        message: "Account deletion cancelled".to_string(),
    }))
}
