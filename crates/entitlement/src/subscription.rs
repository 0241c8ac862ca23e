//! Subscription tier/status updates pushed by the billing webhook
//!
//! The payment provider is the source of truth for tier and status, including
//! when a cancelled subscription finally degrades to free. This module only
//! validates the pair and decides what happens to the free-simulation counter.

use retirezest_shared::{Account, SubscriptionStatus, SubscriptionTier};
use serde::{Deserialize, Serialize};

use crate::change::AccountChange;
use crate::config::DowngradeQuotaPolicy;
use crate::error::{EntitlementError, EntitlementResult};

/// Tier/status pair reported by the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionUpdate {
    pub tier: SubscriptionTier,
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
}

/// `premium` requires an active or trial status; a missing status requires `free`
pub fn validate_tier_status(
    tier: SubscriptionTier,
    status: Option<SubscriptionStatus>,
) -> EntitlementResult<()> {
    let consistent = match (tier, status) {
        (SubscriptionTier::Premium, Some(status)) => status.grants_premium(),
        (SubscriptionTier::Premium, None) => false,
        (SubscriptionTier::Free, _) => true,
    };

    if consistent {
        Ok(())
    } else {
        Err(EntitlementError::InconsistentSubscription { tier, status })
    }
}

/// Decide the change for a subscription update
pub fn apply_subscription_change(
    account: &Account,
    update: SubscriptionUpdate,
    policy: DowngradeQuotaPolicy,
) -> EntitlementResult<AccountChange> {
    validate_tier_status(update.tier, update.status)?;

    let downgraded = account.subscription_tier == SubscriptionTier::Premium
        && update.tier == SubscriptionTier::Free;

    Ok(AccountChange::SubscriptionChanged {
        tier: update.tier,
        status: update.status,
        stripe_customer_id: update.stripe_customer_id,
        reset_free_simulations: downgraded && policy == DowngradeQuotaPolicy::Reset,
    })
}
