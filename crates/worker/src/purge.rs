//! Purge sweep
//!
//! Hard-deletes accounts whose deletion grace period has closed. An account
//! whose deadline is exactly `now` is still recoverable and is left alone.

use retirezest_entitlement::{EntitlementError, LifecycleEngine};
use time::OffsetDateTime;
use tracing::{error, info};

/// Run one sweep and return how many accounts were purged
pub async fn run_purge(
    engine: &LifecycleEngine,
    now: OffsetDateTime,
) -> Result<usize, EntitlementError> {
    match engine.purge_expired(now).await {
        Ok(purged) => {
            if !purged.is_empty() {
                info!(count = purged.len(), "Purge sweep completed");
            }
            Ok(purged.len())
        }
        Err(e) => {
            error!(error = %e, "Purge sweep failed");
            Err(e)
        }
    }
}
