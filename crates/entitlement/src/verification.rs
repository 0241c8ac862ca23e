//! Email verification and password reset decisions

use retirezest_shared::Account;
use time::{Duration, OffsetDateTime};

use crate::change::AccountChange;
use crate::error::{EntitlementError, EntitlementResult};
use crate::tokens::{check_token, IssuedToken};

/// Issue a new email verification token, replacing any outstanding one.
///
/// Returns the raw token for delivery alongside the change to persist.
pub fn issue_verification_token(
    account: &Account,
    now: OffsetDateTime,
    ttl: Duration,
) -> EntitlementResult<(String, AccountChange)> {
    if account.email_verified {
        return Err(EntitlementError::AlreadyVerified);
    }

    let issued = IssuedToken::generate(now, ttl);
    Ok((
        issued.raw,
        AccountChange::VerificationIssued {
            token_hash: issued.hash,
            expires_at: issued.expires_at,
        },
    ))
}

/// Verify the account's email with a presented token.
///
/// `Ok(None)` means the account was already verified and nothing changes.
/// Failures never produce a change.
pub fn verify_email(
    account: &Account,
    token: &str,
    now: OffsetDateTime,
) -> EntitlementResult<Option<AccountChange>> {
    if account.email_verified {
        return Ok(None);
    }

    check_token(
        token,
        account.verification_token_hash.as_deref(),
        account.verification_token_expires_at,
        now,
    )?;

    Ok(Some(AccountChange::EmailVerified))
}

/// Issue a password reset token, replacing any outstanding one
pub fn issue_password_reset_token(
    account: &Account,
    now: OffsetDateTime,
    ttl: Duration,
) -> EntitlementResult<(String, AccountChange)> {
    if account.is_deleted() {
        return Err(EntitlementError::AccountDeleted);
    }

    let issued = IssuedToken::generate(now, ttl);
    Ok((
        issued.raw,
        AccountChange::PasswordResetIssued {
            token_hash: issued.hash,
            expires_at: issued.expires_at,
        },
    ))
}

/// Consume a reset token and set the new (already hashed) password
pub fn reset_password(
    account: &Account,
    token: &str,
    new_password_hash: String,
    now: OffsetDateTime,
) -> EntitlementResult<AccountChange> {
    check_token(
        token,
        account.password_reset_token_hash.as_deref(),
        account.password_reset_expires_at,
        now,
    )?;

    if new_password_hash.is_empty() {
        return Err(EntitlementError::InvalidInput(
            "password hash must not be empty".to_string(),
        ));
    }

    Ok(AccountChange::PasswordReset {
        password_hash: new_password_hash,
    })
}
