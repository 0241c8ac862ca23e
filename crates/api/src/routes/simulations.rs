//! Simulation gating and entitlement routes

use axum::{extract::State, Extension, Json};
use retirezest_entitlement::{Entitlement, QuotaStatus};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{auth::AuthAccount, error::ApiResult, state::AppState};

#[derive(Debug, Serialize)]
pub struct CreditResponse {
    pub free_simulations_used: i32,
    pub quota: QuotaStatus,
}

/// Current entitlement for the caller
pub async fn get_entitlement(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> ApiResult<Json<Entitlement>> {
    let entitlement = state.engine.evaluate_entitlement(auth.account_id).await?;
    Ok(Json(entitlement))
}

/// Remaining free simulations (`-1` when unlimited)
pub async fn get_quota(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> ApiResult<Json<QuotaStatus>> {
    let quota = state.engine.check_simulation_quota(auth.account_id).await?;
    Ok(Json(quota))
}

/// Admit one simulation run. The caller forwards to the projection engine
/// only after this returns 200.
pub async fn consume_credit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> ApiResult<Json<CreditResponse>> {
    let consumed = state
        .engine
        .consume_simulation_credit(auth.account_id, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(CreditResponse {
        free_simulations_used: consumed.free_simulations_used,
        quota: consumed.quota,
    }))
}
