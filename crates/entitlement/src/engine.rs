//! Lifecycle engine
//!
//! Composes the pure decision functions with an [`AccountStore`]. Each
//! operation loads a snapshot, decides, and writes the decision back with a
//! compare-and-swap on the snapshot's version. On a lost race the decision is
//! re-made against the fresh snapshot, so a concurrent duplicate request sees
//! the precondition error (`AlreadyDeleted`, ...) rather than a conflict.

use std::sync::Arc;

use retirezest_shared::{Account, AccountId};
use time::OffsetDateTime;

use crate::change::AccountChange;
use crate::config::EngineConfig;
use crate::deletion::{self, DeletionState};
use crate::entitlement::{evaluate_entitlement, Entitlement};
use crate::error::{EntitlementError, EntitlementResult};
use crate::quota::{self, QuotaStatus};
use crate::store::AccountStore;
use crate::subscription::{self, SubscriptionUpdate};
use crate::tokens::{hash_token, TokenKind};
use crate::verification;

/// Decide-and-swap attempts before reporting `ConcurrentModification`
const MAX_CAS_ATTEMPTS: usize = 3;

/// Result of a signup: the stored account and the raw verification token to email
#[derive(Debug, Clone)]
pub struct Signup {
    pub account: Account,
    pub verification_token: String,
}

/// Result of consuming a simulation credit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditConsumed {
    /// Counter value after the run was admitted
    pub free_simulations_used: i32,
    /// Quota after the run was admitted
    pub quota: QuotaStatus,
}

/// Entitlement and lifecycle engine over an account store
#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn AccountStore>,
    config: Arc<EngineConfig>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn AccountStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load an account, treating a missing row as purged
    pub async fn account(&self, id: AccountId) -> EntitlementResult<Account> {
        self.store
            .get(id)
            .await?
            .ok_or(EntitlementError::AccountNotFound(id))
    }

    /// Look up an account by email, normalizing the address first
    pub async fn account_by_email(&self, email: &str) -> EntitlementResult<Option<Account>> {
        let email = retirezest_shared::normalize_email(email)?;
        self.store.find_by_email(&email).await
    }

    /// Check that the backing store is reachable
    pub async fn ping(&self) -> EntitlementResult<()> {
        self.store.ping().await
    }

    // =========================================================================
    // Signup & verification
    // =========================================================================

    /// Create an unverified free account and issue its first verification token
    pub async fn signup(
        &self,
        email: &str,
        password_hash: Option<String>,
        now: OffsetDateTime,
    ) -> EntitlementResult<Signup> {
        let mut account = Account::new_signup(email, password_hash, now)?;
        let (verification_token, change) =
            verification::issue_verification_token(&account, now, self.config.verification_token_ttl)?;
        change.apply_to(&mut account, now);

        self.store.insert(&account).await?;

        tracing::info!(
            account_id = %account.id,
            email = %account.email,
            "Account created"
        );

        Ok(Signup {
            account,
            verification_token,
        })
    }

    /// Replace the outstanding verification token with a new one
    pub async fn issue_verification_token(
        &self,
        id: AccountId,
        now: OffsetDateTime,
    ) -> EntitlementResult<String> {
        let ttl = self.config.verification_token_ttl;
        let mut raw = String::new();
        self.transition(id, now, |account| {
            let (token, change) = verification::issue_verification_token(account, now, ttl)?;
            raw = token;
            Ok(Some(change))
        })
        .await?;

        tracing::info!(account_id = %id, "Verification token issued");
        Ok(raw)
    }

    /// Verify the account's email with a presented token
    pub async fn verify_email(
        &self,
        id: AccountId,
        token: &str,
        now: OffsetDateTime,
    ) -> EntitlementResult<Account> {
        let result = self
            .transition(id, now, |account| verification::verify_email(account, token, now))
            .await;

        match &result {
            Ok(account) => {
                tracing::info!(account_id = %account.id, "Email verified");
            }
            Err(e @ (EntitlementError::InvalidToken | EntitlementError::ExpiredToken)) => {
                tracing::warn!(account_id = %id, error = %e, "Email verification rejected");
            }
            Err(_) => {}
        }
        result
    }

    /// Verify using only the token, as presented by an emailed link
    pub async fn verify_email_by_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> EntitlementResult<Account> {
        let account = self
            .store
            .find_by_token(TokenKind::EmailVerification, &hash_token(token))
            .await?
            .ok_or(EntitlementError::InvalidToken)?;

        self.verify_email(account.id, token, now).await
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Issue a reset token for the account registered under `email`.
    ///
    /// Returns `None` for unknown addresses so callers can respond identically
    /// either way.
    pub async fn request_password_reset(
        &self,
        email: &str,
        now: OffsetDateTime,
    ) -> EntitlementResult<Option<(AccountId, String)>> {
        let email = retirezest_shared::normalize_email(email)?;
        let Some(account) = self.store.find_by_email(&email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(None);
        };

        let ttl = self.config.password_reset_token_ttl;
        let mut raw = String::new();
        self.transition(account.id, now, |account| {
            let (token, change) = verification::issue_password_reset_token(account, now, ttl)?;
            raw = token;
            Ok(Some(change))
        })
        .await?;

        tracing::info!(account_id = %account.id, "Password reset token issued");
        Ok(Some((account.id, raw)))
    }

    /// Consume a reset token and store the new password hash
    pub async fn reset_password(
        &self,
        token: &str,
        new_password_hash: String,
        now: OffsetDateTime,
    ) -> EntitlementResult<Account> {
        let account = self
            .store
            .find_by_token(TokenKind::PasswordReset, &hash_token(token))
            .await?
            .ok_or(EntitlementError::InvalidToken)?;

        let account = self
            .transition(account.id, now, |account| {
                verification::reset_password(account, token, new_password_hash.clone(), now)
                    .map(Some)
            })
            .await?;

        tracing::info!(account_id = %account.id, "Password reset");
        Ok(account)
    }

    // =========================================================================
    // Simulation quota
    // =========================================================================

    pub async fn check_simulation_quota(&self, id: AccountId) -> EntitlementResult<QuotaStatus> {
        let account = self.account(id).await?;
        Ok(quota::check_simulation_quota(
            &account,
            self.config.free_simulation_limit,
        ))
    }

    /// Admit one simulation run.
    ///
    /// For unverified accounts the check and the increment are a single
    /// conditional store update, so parallel requests can never over-admit.
    pub async fn consume_simulation_credit(
        &self,
        id: AccountId,
        now: OffsetDateTime,
    ) -> EntitlementResult<CreditConsumed> {
        let limit = self.config.free_simulation_limit;
        let account = self.account(id).await?;

        if account.is_deleted() {
            return Err(EntitlementError::AccountDeleted);
        }

        if account.email_verified {
            return Ok(CreditConsumed {
                free_simulations_used: account.free_simulations_used,
                quota: quota::check_simulation_quota(&account, limit),
            });
        }

        if let Some(used) = self.store.try_consume_credit(id, limit, now).await? {
            let remaining = (limit - used).max(0);
            tracing::info!(
                account_id = %id,
                free_simulations_used = used,
                remaining,
                "Free simulation credit consumed"
            );
            return Ok(CreditConsumed {
                free_simulations_used: used,
                quota: QuotaStatus {
                    allowed: remaining > 0,
                    remaining,
                },
            });
        }

        // Guard failed: work out why from the current row
        let current = self.account(id).await?;
        if current.is_deleted() {
            return Err(EntitlementError::AccountDeleted);
        }
        if current.email_verified {
            return Ok(CreditConsumed {
                free_simulations_used: current.free_simulations_used,
                quota: quota::check_simulation_quota(&current, limit),
            });
        }

        tracing::info!(
            account_id = %id,
            free_simulations_used = current.free_simulations_used,
            limit,
            "Free simulation quota exceeded"
        );
        Err(EntitlementError::QuotaExceeded { limit })
    }

    // =========================================================================
    // Soft deletion
    // =========================================================================

    pub async fn request_soft_delete(
        &self,
        id: AccountId,
        reason: Option<String>,
        now: OffsetDateTime,
    ) -> EntitlementResult<Account> {
        let grace = self.config.deletion_grace_period;
        let account = self
            .transition(id, now, |account| {
                deletion::request_soft_delete(account, reason.clone(), now, grace).map(Some)
            })
            .await?;

        tracing::warn!(
            account_id = %id,
            scheduled_deletion_at = ?account.scheduled_deletion_at,
            reason = ?account.deletion_reason,
            "Account scheduled for deletion"
        );
        Ok(account)
    }

    pub async fn recover_account(
        &self,
        id: AccountId,
        now: OffsetDateTime,
    ) -> EntitlementResult<Account> {
        let account = self
            .transition(id, now, |account| deletion::recover_account(account, now).map(Some))
            .await?;

        tracing::info!(account_id = %id, "Account deletion cancelled");
        Ok(account)
    }

    pub async fn deletion_state(&self, id: AccountId) -> EntitlementResult<DeletionState> {
        Ok(DeletionState::of(&self.account(id).await?))
    }

    /// Hard-delete every account whose grace window closed before `now`
    pub async fn purge_expired(&self, now: OffsetDateTime) -> EntitlementResult<Vec<AccountId>> {
        let purged = self.store.purge_expired(now).await?;
        for id in &purged {
            tracing::warn!(account_id = %id, "Account purged");
        }
        Ok(purged)
    }

    // =========================================================================
    // Subscription & entitlement
    // =========================================================================

    pub async fn apply_subscription_change(
        &self,
        id: AccountId,
        update: SubscriptionUpdate,
        now: OffsetDateTime,
    ) -> EntitlementResult<Account> {
        let policy = self.config.downgrade_quota_policy;
        let account = self
            .transition(id, now, |account| {
                subscription::apply_subscription_change(account, update.clone(), policy).map(Some)
            })
            .await?;

        tracing::info!(
            account_id = %id,
            tier = %account.subscription_tier,
            status = ?account.subscription_status,
            free_simulations_used = account.free_simulations_used,
            "Subscription updated"
        );
        Ok(account)
    }

    pub async fn evaluate_entitlement(&self, id: AccountId) -> EntitlementResult<Entitlement> {
        let account = self.account(id).await?;
        Ok(evaluate_entitlement(
            &account,
            self.config.free_simulation_limit,
        ))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Load, decide, compare-and-swap. `decide` returning `Ok(None)` means
    /// "nothing to write" and yields the snapshot unchanged.
    async fn transition<F>(
        &self,
        id: AccountId,
        now: OffsetDateTime,
        mut decide: F,
    ) -> EntitlementResult<Account>
    where
        F: FnMut(&Account) -> EntitlementResult<Option<AccountChange>> + Send,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let account = self.account(id).await?;
            let Some(change) = decide(&account)? else {
                return Ok(account);
            };

            if let Some(updated) = self.store.apply(id, account.version, &change, now).await? {
                tracing::debug!(
                    account_id = %id,
                    change = change.kind(),
                    version = updated.version,
                    "Account transition applied"
                );
                return Ok(updated);
            }

            tracing::debug!(
                account_id = %id,
                change = change.kind(),
                attempt,
                "Account changed underneath transition, re-evaluating"
            );
        }

        Err(EntitlementError::ConcurrentModification(format!(
            "account {} kept changing during update",
            id
        )))
    }
}
