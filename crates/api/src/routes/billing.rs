//! Subscription sync from the billing webhook processor
//!
//! The payment provider's webhook is verified upstream; this internal route
//! only accepts the resulting tier/status and authenticates the caller with a
//! shared secret.

use axum::{extract::State, http::HeaderMap, Json};
use retirezest_entitlement::{Entitlement, SubscriptionUpdate};
use retirezest_shared::AccountId;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const BILLING_SECRET_HEADER: &str = "x-billing-secret";

#[derive(Debug, Deserialize)]
pub struct SubscriptionChangeRequest {
    pub account_id: AccountId,
    #[serde(flatten)]
    pub update: SubscriptionUpdate,
}

/// Constant-time comparison that does not leak where the inputs differ
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        let dummy = vec![0u8; a.len()];
        let _ = a.as_bytes().ct_eq(&dummy);
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Apply a tier/status change pushed by the billing processor
pub async fn apply_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubscriptionChangeRequest>,
) -> ApiResult<Json<Entitlement>> {
    let presented = headers
        .get(BILLING_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !constant_time_compare(presented, &state.config.billing_webhook_secret) {
        tracing::warn!("Subscription change rejected: bad billing secret");
        return Err(ApiError::Unauthorized);
    }

    tracing::info!(
        account_id = %req.account_id,
        tier = %req.update.tier,
        status = ?req.update.status,
        "Subscription change received"
    );

    state
        .engine
        .apply_subscription_change(req.account_id, req.update, OffsetDateTime::now_utc())
        .await?;
    let entitlement = state.engine.evaluate_entitlement(req.account_id).await?;

    Ok(Json(entitlement))
}
