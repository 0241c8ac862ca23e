//! Entitlement Module
//!
//! Provides a unified view of what an account can do based on its tier,
//! subscription status, verification and deletion state.
//!
//! ## Design Principles
//!
//! 1. **Single Source of Truth**: `evaluate_entitlement()` is THE function that determines access
//! 2. **Deterministic**: Same inputs always produce same outputs
//! 3. **Debuggable**: Entitlement includes source tracing for "why" questions
//! 4. **Testable**: Pure function with clear inputs/outputs

use retirezest_shared::{Account, SubscriptionStatus, SubscriptionTier};
use serde::{Deserialize, Serialize};

use crate::deletion::DeletionState;
use crate::quota::{check_simulation_quota, QuotaStatus};

/// Unified entitlement state - answers "what can this account do right now?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementState {
    /// Premium subscription active and in good standing
    PremiumActive,
    /// Premium trial running
    PremiumTrial,
    /// Free tier (never subscribed, or degraded after cancellation/expiry)
    Free,
}

impl std::fmt::Display for EntitlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntitlementState::PremiumActive => write!(f, "premium_active"),
            EntitlementState::PremiumTrial => write!(f, "premium_trial"),
            EntitlementState::Free => write!(f, "free"),
        }
    }
}

/// Source that determined the entitlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementSource {
    /// Based on active subscription
    Subscription,
    /// Trial period
    Trial,
    /// Premium row with a status that doesn't grant premium; served as free
    InconsistentSubscription,
    /// Default (free tier)
    Default,
}

/// Feature flags based on tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementFeatures {
    /// Single-scenario year-by-year projection
    pub basic_projection: bool,
    /// Side-by-side comparison of saved scenarios
    pub scenario_comparison: bool,
    /// RRIF/TFSA/non-registered withdrawal sequencing strategies
    pub withdrawal_optimizer: bool,
    /// CPP/OAS/GIS start-age breakdown
    pub government_benefits_detail: bool,
    /// Downloadable PDF report
    pub pdf_reports: bool,
    /// CSV export of projection tables
    pub csv_export: bool,
}

impl EntitlementFeatures {
    /// Get features for a tier
    pub fn for_tier(tier: SubscriptionTier) -> Self {
        match tier {
            SubscriptionTier::Free => Self {
                basic_projection: true,
                scenario_comparison: false,
                withdrawal_optimizer: false,
                government_benefits_detail: false,
                pdf_reports: false,
                csv_export: false,
            },
            SubscriptionTier::Premium => Self {
                basic_projection: true,
                scenario_comparison: true,
                withdrawal_optimizer: true,
                government_benefits_detail: true,
                pdf_reports: true,
                csv_export: true,
            },
        }
    }
}

/// Complete entitlement information for an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    /// Current entitlement state
    pub state: EntitlementState,
    /// Tier whose features are granted (may be lower than the stored tier)
    pub effective_tier: SubscriptionTier,
    /// Feature flags
    pub features: EntitlementFeatures,
    /// What determined this entitlement
    pub source: EntitlementSource,
    /// Show the "you are on a trial" banner
    pub trial_banner: bool,
    /// Free-simulation quota, before the deletion check
    pub quota: QuotaStatus,
    /// Deletion sub-state
    pub deletion: DeletionState,
    /// Whether a simulation may be started right now
    pub simulations_allowed: bool,
}

impl Entitlement {
    /// Check if a specific feature is enabled
    pub fn has_feature(&self, feature: &str) -> bool {
        match feature {
            "basic_projection" => self.features.basic_projection,
            "scenario_comparison" => self.features.scenario_comparison,
            "withdrawal_optimizer" => self.features.withdrawal_optimizer,
            "government_benefits_detail" => self.features.government_benefits_detail,
            "pdf_reports" => self.features.pdf_reports,
            "csv_export" => self.features.csv_export,
            _ => false,
        }
    }
}

/// Compute the entitlement for an account snapshot.
///
/// Cancelled or expired subscriptions keep whatever tier the billing webhook
/// last wrote; the drop to free at period end arrives as a tier change.
pub fn evaluate_entitlement(account: &Account, free_simulation_limit: i32) -> Entitlement {
    let (state, source, effective_tier) =
        determine_state(account.subscription_tier, account.subscription_status);

    let quota = check_simulation_quota(account, free_simulation_limit);
    let deletion = DeletionState::of(account);

    Entitlement {
        state,
        effective_tier,
        features: EntitlementFeatures::for_tier(effective_tier),
        source,
        trial_banner: state == EntitlementState::PremiumTrial,
        quota,
        deletion,
        simulations_allowed: quota.allowed && deletion == DeletionState::Active,
    }
}

fn determine_state(
    tier: SubscriptionTier,
    status: Option<SubscriptionStatus>,
) -> (EntitlementState, EntitlementSource, SubscriptionTier) {
    match (tier, status) {
        (SubscriptionTier::Free, _) => (
            EntitlementState::Free,
            EntitlementSource::Default,
            SubscriptionTier::Free,
        ),
        (SubscriptionTier::Premium, Some(SubscriptionStatus::Active)) => (
            EntitlementState::PremiumActive,
            EntitlementSource::Subscription,
            SubscriptionTier::Premium,
        ),
        (SubscriptionTier::Premium, Some(SubscriptionStatus::Trial)) => (
            EntitlementState::PremiumTrial,
            EntitlementSource::Trial,
            SubscriptionTier::Premium,
        ),
        (SubscriptionTier::Premium, other) => {
            tracing::warn!(
                status = ?other,
                "Premium tier stored with a non-granting status; serving free features"
            );
            (
                EntitlementState::Free,
                EntitlementSource::InconsistentSubscription,
                SubscriptionTier::Free,
            )
        }
    }
}
