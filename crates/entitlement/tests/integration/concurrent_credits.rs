//! Concurrency tests for credit consumption and lifecycle transitions
//!
//! Parallel requests for the same account must never over-admit simulations
//! or apply a guarded transition twice.

use std::sync::Arc;

use retirezest_entitlement::{
    AccountStore, EngineConfig, EntitlementError, InMemoryAccountStore, LifecycleEngine,
};
use time::OffsetDateTime;

const PARALLEL_REQUESTS: usize = 32;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_credit_is_admitted_exactly_once() {
    let store = Arc::new(InMemoryAccountStore::new());
    let engine = LifecycleEngine::new(store.clone(), EngineConfig::default());
    let now = OffsetDateTime::now_utc();

    let id = engine
        .signup("racer@example.com", None, now)
        .await
        .unwrap()
        .account
        .id;
    engine.consume_simulation_credit(id, now).await.unwrap();
    engine.consume_simulation_credit(id, now).await.unwrap();
    assert_eq!(engine.check_simulation_quota(id).await.unwrap().remaining, 1);

    let handles: Vec<_> = (0..PARALLEL_REQUESTS)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.consume_simulation_credit(id, now).await })
        })
        .collect();

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(EntitlementError::QuotaExceeded { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(rejected, PARALLEL_REQUESTS - 1);
    assert_eq!(
        store.get(id).await.unwrap().unwrap().free_simulations_used,
        3
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_soft_deletes_apply_once() {
    let store = Arc::new(InMemoryAccountStore::new());
    let engine = LifecycleEngine::new(store.clone(), EngineConfig::default());
    let now = OffsetDateTime::now_utc();

    let id = engine
        .signup("double-click@example.com", None, now)
        .await
        .unwrap()
        .account
        .id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.request_soft_delete(id, None, now).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(EntitlementError::AlreadyDeleted) => {}
            Err(EntitlementError::ConcurrentModification(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 1);
    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.deleted_at, Some(now));
}
