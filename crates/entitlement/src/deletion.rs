//! Soft deletion and recovery
//!
//! `Active --request_soft_delete--> PendingDeletion --recover_account--> Active`.
//! Once the deadline passes the sweeper purges the row; a purged account has
//! no state left to transition from.

use retirezest_shared::Account;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::change::AccountChange;
use crate::error::{EntitlementError, EntitlementResult};

/// Deletion sub-state of a stored account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeletionState {
    Active,
    PendingDeletion {
        #[serde(with = "time::serde::rfc3339")]
        deleted_at: OffsetDateTime,
        #[serde(with = "time::serde::rfc3339")]
        scheduled_deletion_at: OffsetDateTime,
    },
}

impl DeletionState {
    pub fn of(account: &Account) -> Self {
        match (account.deleted_at, account.scheduled_deletion_at) {
            (Some(deleted_at), Some(scheduled_deletion_at)) => Self::PendingDeletion {
                deleted_at,
                scheduled_deletion_at,
            },
            _ => Self::Active,
        }
    }

    /// Whether the account can still be recovered at `now`
    pub fn is_recoverable_at(&self, now: OffsetDateTime) -> bool {
        match self {
            Self::Active => false,
            Self::PendingDeletion {
                scheduled_deletion_at,
                ..
            } => now <= *scheduled_deletion_at,
        }
    }
}

/// Schedule the account for deletion after the grace period
pub fn request_soft_delete(
    account: &Account,
    reason: Option<String>,
    now: OffsetDateTime,
    grace_period: Duration,
) -> EntitlementResult<AccountChange> {
    if account.deleted_at.is_some() {
        return Err(EntitlementError::AlreadyDeleted);
    }

    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    Ok(AccountChange::SoftDeleted {
        deleted_at: now,
        scheduled_deletion_at: now + grace_period,
        reason,
    })
}

/// Cancel a pending deletion. The deadline itself is still recoverable.
pub fn recover_account(account: &Account, now: OffsetDateTime) -> EntitlementResult<AccountChange> {
    if account.deleted_at.is_none() {
        return Err(EntitlementError::NotDeleted);
    }

    match account.scheduled_deletion_at {
        Some(deadline) if now <= deadline => Ok(AccountChange::Recovered),
        _ => Err(EntitlementError::RecoveryExpired),
    }
}
