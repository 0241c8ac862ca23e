//! Integration tests for the account lifecycle
//!
//! Drives the engine end to end against the in-memory store.
//!
//! ## Test Coverage
//! - Free quota: three runs, fourth rejected, counter never over-incremented
//! - Verification: expired and wrong tokens leave the account untouched
//! - Soft delete / recover round trips and the inclusive recovery boundary
//! - Subscription changes and the downgrade quota policy
//! - Purge sweeps only accounts past their deadline

use std::sync::Arc;

use retirezest_entitlement::{
    AccountStore, DeletionState, DowngradeQuotaPolicy, EngineConfig, EntitlementError,
    EntitlementState, InMemoryAccountStore, LifecycleEngine, SubscriptionUpdate, UNLIMITED,
};
use retirezest_shared::{SubscriptionStatus, SubscriptionTier};
use time::{Duration, OffsetDateTime};

// ============================================================================
// Test Utilities
// ============================================================================

fn setup(config: EngineConfig) -> (LifecycleEngine, Arc<InMemoryAccountStore>) {
    let store = Arc::new(InMemoryAccountStore::new());
    let engine = LifecycleEngine::new(store.clone(), config);
    (engine, store)
}

fn t0() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap() // 2026-01-01T00:00:00Z
}

// ============================================================================
// Quota
// ============================================================================

#[tokio::test]
async fn test_three_free_runs_then_quota_exceeded() {
    let (engine, store) = setup(EngineConfig::default());
    let signup = engine.signup("saver@example.com", None, t0()).await.unwrap();
    let id = signup.account.id;

    for expected in 1..=3 {
        let consumed = engine.consume_simulation_credit(id, t0()).await.unwrap();
        assert_eq!(consumed.free_simulations_used, expected);
        assert_eq!(consumed.quota.remaining, 3 - expected);
    }

    let err = engine.consume_simulation_credit(id, t0()).await.unwrap_err();
    assert!(matches!(err, EntitlementError::QuotaExceeded { limit: 3 }));

    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.free_simulations_used, 3);

    let quota = engine.check_simulation_quota(id).await.unwrap();
    assert!(!quota.allowed);
    assert_eq!(quota.remaining, 0);
}

#[tokio::test]
async fn test_verification_unlocks_unlimited_without_resetting_counter() {
    let (engine, _store) = setup(EngineConfig::default());
    let signup = engine.signup("saver@example.com", None, t0()).await.unwrap();
    let id = signup.account.id;

    for _ in 0..3 {
        engine.consume_simulation_credit(id, t0()).await.unwrap();
    }
    engine
        .verify_email(id, &signup.verification_token, t0())
        .await
        .unwrap();

    let consumed = engine.consume_simulation_credit(id, t0()).await.unwrap();
    assert_eq!(consumed.free_simulations_used, 3);
    assert_eq!(consumed.quota.remaining, UNLIMITED);
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn test_expired_verification_token_mutates_nothing() {
    let (engine, store) = setup(EngineConfig::default());
    let signup = engine.signup("saver@example.com", None, t0()).await.unwrap();
    let id = signup.account.id;
    let before = store.get(id).await.unwrap().unwrap();

    let late = t0() + Duration::hours(24) + Duration::seconds(1);
    let err = engine
        .verify_email(id, &signup.verification_token, late)
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::ExpiredToken));

    let after = store.get(id).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_password_reset_round_trip() {
    let (engine, _store) = setup(EngineConfig::default());
    let signup = engine
        .signup("saver@example.com", Some("old-hash".into()), t0())
        .await
        .unwrap();

    let (id, token) = engine
        .request_password_reset("SAVER@example.com", t0())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(id, signup.account.id);

    let err = engine
        .reset_password(&token, "new-hash".into(), t0() + Duration::minutes(61))
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::ExpiredToken));

    let account = engine
        .reset_password(&token, "new-hash".into(), t0() + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(account.password_hash.as_deref(), Some("new-hash"));
    assert_eq!(account.password_reset_token_hash, None);
}

// ============================================================================
// Soft delete / recover
// ============================================================================

#[tokio::test]
async fn test_soft_delete_then_recover_restores_account() {
    let (engine, _store) = setup(EngineConfig::default());
    let id = engine
        .signup("leaver@example.com", None, t0())
        .await
        .unwrap()
        .account
        .id;

    let deleted = engine
        .request_soft_delete(id, Some("switching planners".into()), t0())
        .await
        .unwrap();
    assert_eq!(deleted.deleted_at, Some(t0()));
    assert_eq!(deleted.scheduled_deletion_at, Some(t0() + Duration::days(30)));

    let err = engine.request_soft_delete(id, None, t0()).await.unwrap_err();
    assert!(matches!(err, EntitlementError::AlreadyDeleted));

    let recovered = engine.recover_account(id, t0()).await.unwrap();
    assert_eq!(recovered.deleted_at, None);
    assert_eq!(recovered.scheduled_deletion_at, None);
    assert_eq!(recovered.deletion_reason, None);
    assert_eq!(engine.deletion_state(id).await.unwrap(), DeletionState::Active);

    let err = engine.recover_account(id, t0()).await.unwrap_err();
    assert!(matches!(err, EntitlementError::NotDeleted));
}

#[tokio::test]
async fn test_recovery_deadline_is_inclusive() {
    let (engine, _store) = setup(EngineConfig::default());
    let a = engine.signup("a@example.com", None, t0()).await.unwrap().account.id;
    let b = engine.signup("b@example.com", None, t0()).await.unwrap().account.id;
    let deadline = t0() + Duration::days(30);

    engine.request_soft_delete(a, None, t0()).await.unwrap();
    engine.request_soft_delete(b, None, t0()).await.unwrap();

    assert!(engine.recover_account(a, deadline).await.is_ok());
    let err = engine
        .recover_account(b, deadline + Duration::seconds(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::RecoveryExpired));
}

#[tokio::test]
async fn test_second_deletion_uses_new_schedule() {
    let (engine, _store) = setup(EngineConfig::default());
    let id = engine
        .signup("leaver@example.com", None, t0())
        .await
        .unwrap()
        .account
        .id;
    let second = t0() + Duration::days(12);

    engine.request_soft_delete(id, None, t0()).await.unwrap();
    engine.recover_account(id, t0() + Duration::days(2)).await.unwrap();
    let deleted = engine.request_soft_delete(id, None, second).await.unwrap();

    assert_eq!(deleted.scheduled_deletion_at, Some(second + Duration::days(30)));
}

#[tokio::test]
async fn test_grace_period_comes_from_config() {
    let config = EngineConfig {
        deletion_grace_period: Duration::days(7),
        ..EngineConfig::default()
    };
    let (engine, _store) = setup(config);
    let id = engine
        .signup("leaver@example.com", None, t0())
        .await
        .unwrap()
        .account
        .id;

    let deleted = engine.request_soft_delete(id, None, t0()).await.unwrap();
    assert_eq!(deleted.scheduled_deletion_at, Some(t0() + Duration::days(7)));
}

#[tokio::test]
async fn test_purge_removes_only_expired_accounts() {
    let (engine, store) = setup(EngineConfig::default());
    let gone = engine.signup("gone@example.com", None, t0()).await.unwrap().account.id;
    let pending = engine
        .signup("pending@example.com", None, t0())
        .await
        .unwrap()
        .account
        .id;
    let _active = engine.signup("active@example.com", None, t0()).await.unwrap();

    engine.request_soft_delete(gone, None, t0()).await.unwrap();
    engine
        .request_soft_delete(pending, None, t0() + Duration::days(5))
        .await
        .unwrap();

    let purged = engine
        .purge_expired(t0() + Duration::days(31))
        .await
        .unwrap();
    assert_eq!(purged, vec![gone]);
    assert_eq!(store.len().await, 2);

    // Purged is terminal
    assert!(matches!(
        engine.recover_account(gone, t0()).await,
        Err(EntitlementError::AccountNotFound(_))
    ));
}

// ============================================================================
// Subscription & entitlement
// ============================================================================

#[tokio::test]
async fn test_upgrade_trial_then_downgrade() {
    let (engine, _store) = setup(EngineConfig::default());
    let id = engine.signup("member@example.com", None, t0()).await.unwrap().account.id;

    engine
        .apply_subscription_change(
            id,
            SubscriptionUpdate {
                tier: SubscriptionTier::Premium,
                status: Some(SubscriptionStatus::Trial),
                stripe_customer_id: Some("cus_test".into()),
            },
            t0(),
        )
        .await
        .unwrap();
    let ent = engine.evaluate_entitlement(id).await.unwrap();
    assert_eq!(ent.state, EntitlementState::PremiumTrial);
    assert!(ent.trial_banner);
    assert!(ent.features.withdrawal_optimizer);

    let err = engine
        .apply_subscription_change(
            id,
            SubscriptionUpdate {
                tier: SubscriptionTier::Premium,
                status: Some(SubscriptionStatus::Cancelled),
                stripe_customer_id: None,
            },
            t0(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::InconsistentSubscription { .. }));

    let account = engine
        .apply_subscription_change(
            id,
            SubscriptionUpdate {
                tier: SubscriptionTier::Free,
                status: Some(SubscriptionStatus::Cancelled),
                stripe_customer_id: None,
            },
            t0(),
        )
        .await
        .unwrap();
    assert_eq!(account.stripe_customer_id.as_deref(), Some("cus_test"));

    let ent = engine.evaluate_entitlement(id).await.unwrap();
    assert_eq!(ent.state, EntitlementState::Free);
    assert!(!ent.features.withdrawal_optimizer);
}

#[tokio::test]
async fn test_downgrade_policy_reset_restores_free_quota() {
    let config = EngineConfig {
        downgrade_quota_policy: DowngradeQuotaPolicy::Reset,
        ..EngineConfig::default()
    };
    let (engine, _store) = setup(config);
    let id = engine.signup("member@example.com", None, t0()).await.unwrap().account.id;

    for _ in 0..3 {
        engine.consume_simulation_credit(id, t0()).await.unwrap();
    }
    engine
        .apply_subscription_change(
            id,
            SubscriptionUpdate {
                tier: SubscriptionTier::Premium,
                status: Some(SubscriptionStatus::Active),
                stripe_customer_id: None,
            },
            t0(),
        )
        .await
        .unwrap();
    let account = engine
        .apply_subscription_change(
            id,
            SubscriptionUpdate {
                tier: SubscriptionTier::Free,
                status: Some(SubscriptionStatus::Expired),
                stripe_customer_id: None,
            },
            t0(),
        )
        .await
        .unwrap();

    assert_eq!(account.free_simulations_used, 0);
    assert_eq!(engine.check_simulation_quota(id).await.unwrap().remaining, 3);
}
