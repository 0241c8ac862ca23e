//! State deltas produced by the decision functions and persisted by a store

use retirezest_shared::{Account, SubscriptionStatus, SubscriptionTier};
use time::OffsetDateTime;

/// A single persisted state transition.
///
/// Every variant that consumes a token also clears that token, so the store
/// writes both in one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChange {
    VerificationIssued {
        token_hash: String,
        expires_at: OffsetDateTime,
    },
    EmailVerified,
    PasswordResetIssued {
        token_hash: String,
        expires_at: OffsetDateTime,
    },
    PasswordReset {
        password_hash: String,
    },
    SoftDeleted {
        deleted_at: OffsetDateTime,
        scheduled_deletion_at: OffsetDateTime,
        reason: Option<String>,
    },
    Recovered,
    SubscriptionChanged {
        tier: SubscriptionTier,
        status: Option<SubscriptionStatus>,
        stripe_customer_id: Option<String>,
        reset_free_simulations: bool,
    },
}

impl AccountChange {
    /// Short name for logs and audit trails
    pub fn kind(&self) -> &'static str {
        match self {
            AccountChange::VerificationIssued { .. } => "verification_issued",
            AccountChange::EmailVerified => "email_verified",
            AccountChange::PasswordResetIssued { .. } => "password_reset_issued",
            AccountChange::PasswordReset { .. } => "password_reset",
            AccountChange::SoftDeleted { .. } => "soft_deleted",
            AccountChange::Recovered => "recovered",
            AccountChange::SubscriptionChanged { .. } => "subscription_changed",
        }
    }

    /// Apply the change to an in-memory snapshot. Does not touch `version`.
    pub fn apply_to(&self, account: &mut Account, now: OffsetDateTime) {
        match self {
            AccountChange::VerificationIssued {
                token_hash,
                expires_at,
            } => {
                account.verification_token_hash = Some(token_hash.clone());
                account.verification_token_expires_at = Some(*expires_at);
            }
            AccountChange::EmailVerified => {
                account.email_verified = true;
                account.verification_token_hash = None;
                account.verification_token_expires_at = None;
            }
            AccountChange::PasswordResetIssued {
                token_hash,
                expires_at,
            } => {
                account.password_reset_token_hash = Some(token_hash.clone());
                account.password_reset_expires_at = Some(*expires_at);
            }
            AccountChange::PasswordReset { password_hash } => {
                account.password_hash = Some(password_hash.clone());
                account.password_reset_token_hash = None;
                account.password_reset_expires_at = None;
            }
            AccountChange::SoftDeleted {
                deleted_at,
                scheduled_deletion_at,
                reason,
            } => {
                account.deleted_at = Some(*deleted_at);
                account.scheduled_deletion_at = Some(*scheduled_deletion_at);
                account.deletion_reason = reason.clone();
            }
            AccountChange::Recovered => {
                account.deleted_at = None;
                account.scheduled_deletion_at = None;
                account.deletion_reason = None;
            }
            AccountChange::SubscriptionChanged {
                tier,
                status,
                stripe_customer_id,
                reset_free_simulations,
            } => {
                account.subscription_tier = *tier;
                account.subscription_status = *status;
                if let Some(customer_id) = stripe_customer_id {
                    account.stripe_customer_id = Some(customer_id.clone());
                }
                if *reset_free_simulations {
                    account.free_simulations_used = 0;
                }
            }
        }
        account.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn account() -> Account {
        Account::new_signup("saver@example.com", None, OffsetDateTime::now_utc()).unwrap()
    }

    #[test]
    fn test_email_verified_clears_token() {
        let now = OffsetDateTime::now_utc();
        let mut account = account();
        AccountChange::VerificationIssued {
            token_hash: "abc".into(),
            expires_at: now + Duration::hours(1),
        }
        .apply_to(&mut account, now);
        assert!(account.verification_token_hash.is_some());

        AccountChange::EmailVerified.apply_to(&mut account, now);
        assert!(account.email_verified);
        assert_eq!(account.verification_token_hash, None);
        assert_eq!(account.verification_token_expires_at, None);
    }

    #[test]
    fn test_subscription_change_keeps_customer_when_not_supplied() {
        let now = OffsetDateTime::now_utc();
        let mut account = account();
        account.stripe_customer_id = Some("cus_123".into());
        account.free_simulations_used = 3;

        AccountChange::SubscriptionChanged {
            tier: SubscriptionTier::Free,
            status: Some(SubscriptionStatus::Expired),
            stripe_customer_id: None,
            reset_free_simulations: false,
        }
        .apply_to(&mut account, now);

        assert_eq!(account.stripe_customer_id.as_deref(), Some("cus_123"));
        assert_eq!(account.free_simulations_used, 3);
        assert_eq!(account.subscription_status, Some(SubscriptionStatus::Expired));
    }
}
