//! Entitlement error types

use retirezest_shared::{AccountId, RetireError, SubscriptionStatus, SubscriptionTier};
use thiserror::Error;

/// Errors produced by the entitlement and lifecycle engine.
///
/// Everything except `StorageUnavailable` and `ConcurrentModification` is an
/// expected outcome the end user can resolve by taking a different action.
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("Free simulation limit of {limit} reached. Verify your email to unlock unlimited simulations")]
    QuotaExceeded { limit: i32 },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Account is already scheduled for deletion")]
    AlreadyDeleted,

    #[error("Account is not scheduled for deletion")]
    NotDeleted,

    #[error("Recovery window has closed for this account")]
    RecoveryExpired,

    #[error("Account is scheduled for deletion")]
    AccountDeleted,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Inconsistent subscription: tier {tier} cannot have status {status:?}")]
    InconsistentSubscription {
        tier: SubscriptionTier,
        status: Option<SubscriptionStatus>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Concurrent modification detected: {0}")]
    ConcurrentModification(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl EntitlementError {
    /// True for outcomes the user resolves themselves (upgrade, new link, ...);
    /// false for faults the caller should retry or report.
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::StorageUnavailable(_) | Self::ConcurrentModification(_)
        )
    }
}

impl From<sqlx::Error> for EntitlementError {
    fn from(err: sqlx::Error) -> Self {
        EntitlementError::StorageUnavailable(err.to_string())
    }
}

impl From<RetireError> for EntitlementError {
    fn from(err: RetireError) -> Self {
        match err {
            RetireError::Validation(msg) => EntitlementError::InvalidInput(msg),
            RetireError::NotFound(msg) => EntitlementError::InvalidInput(msg),
            RetireError::Internal(msg) => EntitlementError::StorageUnavailable(msg),
        }
    }
}

pub type EntitlementResult<T> = Result<T, EntitlementError>;
