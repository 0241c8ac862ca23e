//! Free-simulation quota
//!
//! Unverified accounts get a fixed number of projection runs. Verifying the
//! email address makes the counter irrelevant; it is never reset by it.

use retirezest_shared::Account;
use serde::{Deserialize, Serialize};

use crate::error::{EntitlementError, EntitlementResult};

/// `remaining` value reported for accounts with no simulation limit
pub const UNLIMITED: i32 = -1;

/// Result of a quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub allowed: bool,
    /// Runs left, or [`UNLIMITED`]
    pub remaining: i32,
}

impl QuotaStatus {
    pub fn is_unlimited(&self) -> bool {
        self.remaining == UNLIMITED
    }
}

/// Whether the account may run another simulation, and how many are left
pub fn check_simulation_quota(account: &Account, free_limit: i32) -> QuotaStatus {
    if account.email_verified {
        return QuotaStatus {
            allowed: true,
            remaining: UNLIMITED,
        };
    }

    let remaining = (free_limit - account.free_simulations_used).max(0);
    QuotaStatus {
        allowed: remaining > 0,
        remaining,
    }
}

/// Counter value after consuming one credit.
///
/// Verified accounts are admitted without touching the counter. Stores must
/// perform the increment as one conditional update; this function only
/// decides.
pub fn consume_simulation_credit(account: &Account, free_limit: i32) -> EntitlementResult<i32> {
    let status = check_simulation_quota(account, free_limit);
    if !status.allowed {
        return Err(EntitlementError::QuotaExceeded { limit: free_limit });
    }

    if status.is_unlimited() {
        Ok(account.free_simulations_used)
    } else {
        Ok(account.free_simulations_used + 1)
    }
}
