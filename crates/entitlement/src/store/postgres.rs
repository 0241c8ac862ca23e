//! Postgres account store
//!
//! Each transition is one conditional `UPDATE ... RETURNING *` so the guard and
//! the write happen in the same statement.

use async_trait::async_trait;
use retirezest_shared::{Account, AccountId};
use sqlx::PgPool;
use time::OffsetDateTime;

use super::AccountStore;
use crate::change::AccountChange;
use crate::error::{EntitlementError, EntitlementResult};
use crate::tokens::TokenKind;

/// PostgreSQL unique violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn ping(&self) -> EntitlementResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, id: AccountId) -> EntitlementResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> EntitlementResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_by_token(
        &self,
        kind: TokenKind,
        token_hash: &str,
    ) -> EntitlementResult<Option<Account>> {
        let sql = match kind {
            TokenKind::EmailVerification => {
                "SELECT * FROM accounts WHERE verification_token_hash = $1"
            }
            TokenKind::PasswordReset => {
                "SELECT * FROM accounts WHERE password_reset_token_hash = $1"
            }
        };

        let account = sqlx::query_as::<_, Account>(sql)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn insert(&self, account: &Account) -> EntitlementResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, password_hash, email_verified,
                verification_token_hash, verification_token_expires_at,
                password_reset_token_hash, password_reset_expires_at,
                free_simulations_used, subscription_tier, subscription_status,
                stripe_customer_id, deleted_at, scheduled_deletion_at, deletion_reason,
                created_at, updated_at, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18
            )
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.email_verified)
        .bind(&account.verification_token_hash)
        .bind(account.verification_token_expires_at)
        .bind(&account.password_reset_token_hash)
        .bind(account.password_reset_expires_at)
        .bind(account.free_simulations_used)
        .bind(account.subscription_tier)
        .bind(account.subscription_status)
        .bind(&account.stripe_customer_id)
        .bind(account.deleted_at)
        .bind(account.scheduled_deletion_at)
        .bind(&account.deletion_reason)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(account.version)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(EntitlementError::EmailAlreadyRegistered(account.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn try_consume_credit(
        &self,
        id: AccountId,
        limit: i32,
        now: OffsetDateTime,
    ) -> EntitlementResult<Option<i32>> {
        let used: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET free_simulations_used = free_simulations_used + 1,
                version = version + 1,
                updated_at = $3
            WHERE id = $1
              AND email_verified = FALSE
              AND deleted_at IS NULL
              AND free_simulations_used < $2
            RETURNING free_simulations_used
            "#,
        )
        .bind(id)
        .bind(limit)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(used)
    }

    async fn apply(
        &self,
        id: AccountId,
        expected_version: i64,
        change: &AccountChange,
        now: OffsetDateTime,
    ) -> EntitlementResult<Option<Account>> {
        // $1 = id, $2 = expected version, $3 = now; change-specific binds follow
        let updated = match change {
            AccountChange::VerificationIssued {
                token_hash,
                expires_at,
            } => {
                sqlx::query_as::<_, Account>(
                    r#"
                    UPDATE accounts
                    SET verification_token_hash = $4,
                        verification_token_expires_at = $5,
                        version = version + 1, updated_at = $3
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(now)
                .bind(token_hash)
                .bind(expires_at)
                .fetch_optional(&self.pool)
                .await?
            }
            AccountChange::EmailVerified => {
                sqlx::query_as::<_, Account>(
                    r#"
                    UPDATE accounts
                    SET email_verified = TRUE,
                        verification_token_hash = NULL,
                        verification_token_expires_at = NULL,
                        version = version + 1, updated_at = $3
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?
            }
            AccountChange::PasswordResetIssued {
                token_hash,
                expires_at,
            } => {
                sqlx::query_as::<_, Account>(
                    r#"
                    UPDATE accounts
                    SET password_reset_token_hash = $4,
                        password_reset_expires_at = $5,
                        version = version + 1, updated_at = $3
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(now)
                .bind(token_hash)
                .bind(expires_at)
                .fetch_optional(&self.pool)
                .await?
            }
            AccountChange::PasswordReset { password_hash } => {
                sqlx::query_as::<_, Account>(
                    r#"
                    UPDATE accounts
                    SET password_hash = $4,
                        password_reset_token_hash = NULL,
                        password_reset_expires_at = NULL,
                        version = version + 1, updated_at = $3
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(now)
                .bind(password_hash)
                .fetch_optional(&self.pool)
                .await?
            }
            AccountChange::SoftDeleted {
                deleted_at,
                scheduled_deletion_at,
                reason,
            } => {
                sqlx::query_as::<_, Account>(
                    r#"
                    UPDATE accounts
                    SET deleted_at = $4,
                        scheduled_deletion_at = $5,
                        deletion_reason = $6,
                        version = version + 1, updated_at = $3
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(now)
                .bind(deleted_at)
                .bind(scheduled_deletion_at)
                .bind(reason)
                .fetch_optional(&self.pool)
                .await?
            }
            AccountChange::Recovered => {
                sqlx::query_as::<_, Account>(
                    r#"
                    UPDATE accounts
                    SET deleted_at = NULL,
                        scheduled_deletion_at = NULL,
                        deletion_reason = NULL,
                        version = version + 1, updated_at = $3
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?
            }
            AccountChange::SubscriptionChanged {
                tier,
                status,
                stripe_customer_id,
                reset_free_simulations,
            } => {
                sqlx::query_as::<_, Account>(
                    r#"
                    UPDATE accounts
                    SET subscription_tier = $4,
                        subscription_status = $5,
                        stripe_customer_id = COALESCE($6, stripe_customer_id),
                        free_simulations_used = CASE WHEN $7 THEN 0 ELSE free_simulations_used END,
                        version = version + 1, updated_at = $3
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(now)
                .bind(tier)
                .bind(status)
                .bind(stripe_customer_id)
                .bind(reset_free_simulations)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(updated)
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> EntitlementResult<Vec<AccountId>> {
        let purged: Vec<AccountId> = sqlx::query_scalar(
            r#"
            DELETE FROM accounts
            WHERE scheduled_deletion_at IS NOT NULL
              AND scheduled_deletion_at < $1
            RETURNING id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(purged)
    }
}
