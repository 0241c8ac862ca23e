//! Account routes: signup, login, email verification, password reset

use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use retirezest_entitlement::{Entitlement, EntitlementError};
use retirezest_shared::{Account, AccountId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    auth::{hash_password, validate_password_strength, verify_password, AuthAccount},
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Floor on forgot-password latency so known and unknown emails look alike
const FORGOT_PASSWORD_MIN_RESPONSE: Duration = Duration::from_millis(500);

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub email: String,
    pub email_verified: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_deletion_at: Option<OffsetDateTime>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            email_verified: account.email_verified,
            scheduled_deletion_at: account.scheduled_deletion_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub account: AccountResponse,
    pub entitlement: Entitlement,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Handlers
// =============================================================================

fn session_response(
    state: &AppState,
    account: &Account,
    entitlement: Entitlement,
) -> ApiResult<SessionResponse> {
    let access_token = state
        .jwt
        .generate_token(account.id, &account.email)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to issue session token");
            ApiError::Internal
        })?;

    Ok(SessionResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.jwt.expiry_seconds(),
        account: AccountResponse::from(account),
        entitlement,
    })
}

/// Create an account and email its verification link
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    if !state.config.enable_signup {
        return Err(ApiError::Forbidden);
    }

    validate_password_strength(&req.password).map_err(|e| ApiError::Validation(e.to_string()))?;
    let password_hash = hash_password(&req.password).map_err(|_| ApiError::Internal)?;

    let signup = state
        .engine
        .signup(&req.email, Some(password_hash), OffsetDateTime::now_utc())
        .await?;

    state
        .mailer
        .send_email_verification(&signup.account.email, &signup.verification_token)
        .await;

    let entitlement = state.engine.evaluate_entitlement(signup.account.id).await?;
    let response = session_response(&state, &signup.account, entitlement)?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange email and password for a session token.
///
/// Accounts pending deletion may still log in so they can recover.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let account = state
        .engine
        .account_by_email(&req.email)
        .await
        .map_err(|e| match e {
            EntitlementError::InvalidInput(_) => ApiError::Unauthorized,
            other => ApiError::from(other),
        })?
        .ok_or(ApiError::Unauthorized)?;

    let Some(stored_hash) = account.password_hash.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    let valid = verify_password(&req.password, stored_hash).map_err(|e| {
        tracing::error!(account_id = %account.id, error = %e, "Stored password hash is unreadable");
        ApiError::Internal
    })?;
    if !valid {
        tracing::info!(account_id = %account.id, "Login rejected");
        return Err(ApiError::Unauthorized);
    }

    let entitlement = state.engine.evaluate_entitlement(account.id).await?;
    tracing::info!(account_id = %account.id, "Login succeeded");

    Ok(Json(session_response(&state, &account, entitlement)?))
}

/// Verify an email address with the token from the emailed link.
///
/// With a session the token is checked against the caller's account, so a
/// repeated click after verification succeeds without changing anything.
pub async fn verify_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Json<AccountResponse>> {
    let now = OffsetDateTime::now_utc();
    let account = match state.sessions.resolve(&headers) {
        Some(account_id) => state.engine.verify_email(account_id, &req.token, now).await?,
        None => state.engine.verify_email_by_token(&req.token, now).await?,
    };

    Ok(Json(AccountResponse::from(&account)))
}

/// Issue a fresh verification link for the caller
pub async fn resend_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAccount>,
) -> ApiResult<Json<MessageResponse>> {
    let token = state
        .engine
        .issue_verification_token(auth.account_id, OffsetDateTime::now_utc())
        .await?;
    let account = state.engine.account(auth.account_id).await?;

    state.mailer.send_email_verification(&account.email, &token).await;

    Ok(Json(MessageResponse {
        message: "Verification email sent".to_string(),
    }))
}

/// Start a password reset. Always succeeds to prevent email enumeration.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let start = Instant::now();

    match state
        .engine
        .request_password_reset(&req.email, OffsetDateTime::now_utc())
        .await
    {
        Ok(Some((account_id, token))) => match state.engine.account(account_id).await {
            Ok(account) => state.mailer.send_password_reset(&account.email, &token).await,
            Err(e) => {
                tracing::warn!(account_id = %account_id, error = %e, "Reset issued for vanished account")
            }
        },
        Ok(None) => {}
        Err(e) if e.is_user_recoverable() => {
            tracing::info!(error = %e, "Password reset not issued");
        }
        Err(e) => return Err(e.into()),
    }

    let elapsed = start.elapsed();
    if elapsed < FORGOT_PASSWORD_MIN_RESPONSE {
        tokio::time::sleep(FORGOT_PASSWORD_MIN_RESPONSE - elapsed).await;
    }

    Ok(Json(MessageResponse {
        message: "If an account exists for that email, a reset link has been sent".to_string(),
    }))
}

/// Complete a password reset
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validate_password_strength(&req.new_password)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let password_hash = hash_password(&req.new_password).map_err(|_| ApiError::Internal)?;

    state
        .engine
        .reset_password(&req.token, password_hash, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}
