//! API routes

pub mod accounts;
pub mod billing;
pub mod deletion;
pub mod health;
pub mod simulations;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{auth::require_auth, state::AppState};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness));

    // Public API routes (no session required) - under /api/v1
    let public_api_routes = Router::new()
        .route("/accounts/signup", post(accounts::signup))
        .route("/accounts/login", post(accounts::login))
        .route("/accounts/verify-email", post(accounts::verify_email))
        .route("/accounts/forgot-password", post(accounts::forgot_password))
        .route("/accounts/reset-password", post(accounts::reset_password))
        // Internal: authenticated by shared secret, not a session
        .route("/billing/subscription", post(billing::apply_subscription));

    // Protected API routes (session required) - under /api/v1
    let protected_api_routes = Router::new()
        .route("/accounts/resend-verification", post(accounts::resend_verification))
        .route("/me/entitlement", get(simulations::get_entitlement))
        .route(
            "/me/deletion",
            get(deletion::get_deletion)
                .post(deletion::request_deletion)
                .delete(deletion::recover),
        )
        .route("/simulations/quota", get(simulations::get_quota))
        .route("/simulations/credits", post(simulations::consume_credit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", public_api_routes.merge(protected_api_routes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
