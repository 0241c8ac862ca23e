//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use retirezest_entitlement::EntitlementError;
use serde_json::json;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Authentication required")]
    Unauthorized,
    #[error("Insufficient permissions")]
    Forbidden,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Lifecycle and entitlement outcomes
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    // Internal errors
    #[error("Internal server error")]
    Internal,
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::Entitlement(err) => entitlement_parts(err),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
            ApiError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", self.to_string()),
        }
    }
}

fn entitlement_parts(err: &EntitlementError) -> (StatusCode, &'static str, String) {
    use EntitlementError as E;

    let (status, code) = match err {
        E::QuotaExceeded { .. } => (StatusCode::PAYMENT_REQUIRED, "QUOTA_EXCEEDED"),
        E::InvalidToken => (StatusCode::BAD_REQUEST, "INVALID_TOKEN"),
        E::ExpiredToken => (StatusCode::GONE, "EXPIRED_TOKEN"),
        E::AlreadyDeleted => (StatusCode::CONFLICT, "ALREADY_DELETED"),
        E::NotDeleted => (StatusCode::CONFLICT, "NOT_DELETED"),
        E::RecoveryExpired => (StatusCode::GONE, "RECOVERY_EXPIRED"),
        E::AccountDeleted => (StatusCode::FORBIDDEN, "ACCOUNT_DELETED"),
        E::AlreadyVerified => (StatusCode::CONFLICT, "ALREADY_VERIFIED"),
        E::EmailAlreadyRegistered(_) => (StatusCode::CONFLICT, "EMAIL_EXISTS"),
        E::AccountNotFound(_) => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
        E::InconsistentSubscription { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INCONSISTENT_SUBSCRIPTION")
        }
        E::InvalidInput(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        E::ConcurrentModification(_) => (StatusCode::CONFLICT, "CONCURRENT_MODIFICATION"),
        E::StorageUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
    };

    // Never leak storage details or the registered address back to the client
    let message = match err {
        E::StorageUnavailable(_) => "Service unavailable".to_string(),
        E::EmailAlreadyRegistered(_) => "Email already registered".to_string(),
        E::AccountNotFound(_) => "Account not found".to_string(),
        _ => err.to_string(),
    };

    (status, code, message)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use retirezest_shared::AccountId;

    #[test]
    fn test_entitlement_errors_map_to_statuses() {
        let cases = [
            (EntitlementError::QuotaExceeded { limit: 3 }, StatusCode::PAYMENT_REQUIRED),
            (EntitlementError::InvalidToken, StatusCode::BAD_REQUEST),
            (EntitlementError::ExpiredToken, StatusCode::GONE),
            (EntitlementError::AlreadyDeleted, StatusCode::CONFLICT),
            (EntitlementError::NotDeleted, StatusCode::CONFLICT),
            (EntitlementError::RecoveryExpired, StatusCode::GONE),
            (
                EntitlementError::AccountNotFound(AccountId::new()),
                StatusCode::NOT_FOUND,
            ),
            (
                EntitlementError::StorageUnavailable("pool timed out".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            let (status, _, _) = ApiError::from(err).parts();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let (_, code, message) =
            ApiError::from(EntitlementError::StorageUnavailable("password=hunter2".into())).parts();
        assert_eq!(code, "SERVICE_UNAVAILABLE");
        assert!(!message.contains("hunter2"));
    }

    #[test]
    fn test_quota_message_explains_next_step() {
        let (_, code, message) =
            ApiError::from(EntitlementError::QuotaExceeded { limit: 3 }).parts();
        assert_eq!(code, "QUOTA_EXCEEDED");
        assert!(message.contains("Verify your email"));
    }
}
