//! Account model and enums shared across RetireZest services

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::RetireError;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Account ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AccountId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

impl Default for SubscriptionTier {
    fn default() -> Self {
        Self::Free
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Premium => write!(f, "premium"),
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            _ => Err(format!("Invalid subscription tier: {}", s)),
        }
    }
}

/// Subscription status as reported by the payment provider.
/// `None` on an account means no subscription was ever started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    /// Statuses that keep premium features switched on
    pub fn grants_premium(&self) -> bool {
        matches!(self, Self::Active | Self::Trial)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Trial => write!(f, "trial"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "trial" | "trialing" => Ok(Self::Trial),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// Identity and entitlement record for a single account.
///
/// Token columns only ever hold SHA-256 digests; the raw token is handed to
/// the caller once, at issue time.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: Option<String>,

    pub email_verified: bool,
    pub verification_token_hash: Option<String>,
    pub verification_token_expires_at: Option<OffsetDateTime>,

    pub password_reset_token_hash: Option<String>,
    pub password_reset_expires_at: Option<OffsetDateTime>,

    pub free_simulations_used: i32,

    pub subscription_tier: SubscriptionTier,
    pub subscription_status: Option<SubscriptionStatus>,
    pub stripe_customer_id: Option<String>,

    pub deleted_at: Option<OffsetDateTime>,
    pub scheduled_deletion_at: Option<OffsetDateTime>,
    pub deletion_reason: Option<String>,

    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Optimistic-concurrency counter, bumped on every write
    pub version: i64,
}

impl Account {
    /// Fresh account as created by signup: unverified, free tier, no usage
    pub fn new_signup(
        email: &str,
        password_hash: Option<String>,
        now: OffsetDateTime,
    ) -> Result<Self, RetireError> {
        Ok(Self {
            id: AccountId::new(),
            email: normalize_email(email)?,
            password_hash,
            email_verified: false,
            verification_token_hash: None,
            verification_token_expires_at: None,
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            free_simulations_used: 0,
            subscription_tier: SubscriptionTier::Free,
            subscription_status: None,
            stripe_customer_id: None,
            deleted_at: None,
            scheduled_deletion_at: None,
            deletion_reason: None,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Trim and lowercase an email address so uniqueness is case-insensitive
pub fn normalize_email(email: &str) -> Result<String, RetireError> {
    let normalized = email.trim().to_lowercase();

    let valid = match normalized.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !normalized.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(RetireError::Validation(format!(
            "Invalid email address: {}",
            email.trim()
        )));
    }

    Ok(normalized)
}
