//! Session resolution
//!
//! Every authenticated route goes through one [`SessionProvider`]. The
//! resolved account is handed to handlers as an [`AuthAccount`] extension.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use retirezest_shared::AccountId;

use super::jwt::JwtManager;
use crate::{error::ApiError, state::AppState};

/// Resolves the calling account from request headers
pub trait SessionProvider: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<AccountId>;
}

/// Bearer-token sessions signed with the API's JWT secret
#[derive(Clone)]
pub struct JwtSessionProvider {
    jwt: Arc<JwtManager>,
}

impl JwtSessionProvider {
    pub fn new(jwt: Arc<JwtManager>) -> Self {
        Self { jwt }
    }
}

impl SessionProvider for JwtSessionProvider {
    fn resolve(&self, headers: &HeaderMap) -> Option<AccountId> {
        let token = bearer_token(headers)?;
        match self.jwt.validate_token(token) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                None
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct AuthAccount {
    pub account_id: AccountId,
}

/// Reject requests without a valid session and attach [`AuthAccount`]
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let account_id = state
        .sessions
        .resolve(request.headers())
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(AuthAccount { account_id });
    Ok(next.run(request).await)
}
