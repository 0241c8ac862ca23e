//! In-process account store for tests and local development

use std::collections::HashMap;

use async_trait::async_trait;
use retirezest_shared::{Account, AccountId};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::AccountStore;
use crate::change::AccountChange;
use crate::error::{EntitlementError, EntitlementResult};
use crate::tokens::TokenKind;

/// Account store backed by a `HashMap` behind a write lock.
///
/// Each conditional update runs under the lock, which gives the same
/// all-or-nothing behaviour as the single-statement Postgres updates.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn ping(&self) -> EntitlementResult<()> {
        Ok(())
    }

    async fn get(&self, id: AccountId) -> EntitlementResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> EntitlementResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_token(
        &self,
        kind: TokenKind,
        token_hash: &str,
    ) -> EntitlementResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        let found = accounts.values().find(|a| {
            let stored = match kind {
                TokenKind::EmailVerification => a.verification_token_hash.as_deref(),
                TokenKind::PasswordReset => a.password_reset_token_hash.as_deref(),
            };
            stored == Some(token_hash)
        });
        Ok(found.cloned())
    }

    async fn insert(&self, account: &Account) -> EntitlementResult<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(EntitlementError::EmailAlreadyRegistered(account.email.clone()));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn try_consume_credit(
        &self,
        id: AccountId,
        limit: i32,
        now: OffsetDateTime,
    ) -> EntitlementResult<Option<i32>> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };

        if account.email_verified
            || account.deleted_at.is_some()
            || account.free_simulations_used >= limit
        {
            return Ok(None);
        }

        account.free_simulations_used += 1;
        account.version += 1;
        account.updated_at = now;
        Ok(Some(account.free_simulations_used))
    }

    async fn apply(
        &self,
        id: AccountId,
        expected_version: i64,
        change: &AccountChange,
        now: OffsetDateTime,
    ) -> EntitlementResult<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };

        if account.version != expected_version {
            return Ok(None);
        }

        change.apply_to(account, now);
        account.version += 1;
        Ok(Some(account.clone()))
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> EntitlementResult<Vec<AccountId>> {
        let mut accounts = self.accounts.write().await;
        let expired: Vec<AccountId> = accounts
            .values()
            .filter(|a| matches!(a.scheduled_deletion_at, Some(deadline) if deadline < now))
            .map(|a| a.id)
            .collect();

        for id in &expired {
            accounts.remove(id);
        }
        Ok(expired)
    }
}
