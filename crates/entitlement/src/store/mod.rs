//! Account persistence
//!
//! Every write is conditional: credit consumption checks the limit inside the
//! update, and all other transitions compare-and-swap on `version`. A store
//! never performs a read-then-write pair in application code.

mod memory;
mod postgres;

pub use memory::InMemoryAccountStore;
pub use postgres::PgAccountStore;

use async_trait::async_trait;
use retirezest_shared::{Account, AccountId};
use time::OffsetDateTime;

use crate::change::AccountChange;
use crate::error::EntitlementResult;
use crate::tokens::TokenKind;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> EntitlementResult<()>;

    async fn get(&self, id: AccountId) -> EntitlementResult<Option<Account>>;

    /// Look up by normalized email
    async fn find_by_email(&self, email: &str) -> EntitlementResult<Option<Account>>;

    /// Look up by the stored digest of an outstanding token
    async fn find_by_token(
        &self,
        kind: TokenKind,
        token_hash: &str,
    ) -> EntitlementResult<Option<Account>>;

    /// Insert a new account. Fails with `EmailAlreadyRegistered` on a duplicate email.
    async fn insert(&self, account: &Account) -> EntitlementResult<()>;

    /// Atomically increment the free-simulation counter if the account is
    /// unverified, not soft-deleted and below `limit`.
    ///
    /// Returns the new counter, or `None` when the guard did not hold.
    async fn try_consume_credit(
        &self,
        id: AccountId,
        limit: i32,
        now: OffsetDateTime,
    ) -> EntitlementResult<Option<i32>>;

    /// Apply `change` only if the stored version still equals `expected_version`.
    ///
    /// Returns the updated account, or `None` on a version mismatch or missing row.
    async fn apply(
        &self,
        id: AccountId,
        expected_version: i64,
        change: &AccountChange,
        now: OffsetDateTime,
    ) -> EntitlementResult<Option<Account>>;

    /// Hard-delete accounts whose `scheduled_deletion_at` is strictly before `now`
    async fn purge_expired(&self, now: OffsetDateTime) -> EntitlementResult<Vec<AccountId>>;
}
