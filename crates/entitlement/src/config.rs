//! Engine configuration
//!
//! The engine owns its limits and windows; callers never hard-code the free
//! simulation limit or the deletion grace period.

use std::env;
use time::Duration;

/// Default number of simulations an unverified account may run
pub const DEFAULT_FREE_SIMULATION_LIMIT: i32 = 3;

/// Default soft-delete grace period in days
pub const DEFAULT_DELETION_GRACE_PERIOD_DAYS: i64 = 30;

/// Default email verification token lifetime in hours
pub const DEFAULT_VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;

/// Default password reset token lifetime in minutes
pub const DEFAULT_PASSWORD_RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// What happens to the free-simulation counter when a premium account drops
/// back to the free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DowngradeQuotaPolicy {
    /// Keep historical usage (current production behavior)
    #[default]
    KeepUsage,
    /// Give the returning free user a fresh quota
    Reset,
}

impl std::str::FromStr for DowngradeQuotaPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep_usage" | "keep" => Ok(Self::KeepUsage),
            "reset" => Ok(Self::Reset),
            _ => Err(format!("Invalid downgrade quota policy: {}", s)),
        }
    }
}

/// Entitlement engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub free_simulation_limit: i32,
    pub deletion_grace_period: Duration,
    pub verification_token_ttl: Duration,
    pub password_reset_token_ttl: Duration,
    pub downgrade_quota_policy: DowngradeQuotaPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            free_simulation_limit: DEFAULT_FREE_SIMULATION_LIMIT,
            deletion_grace_period: Duration::days(DEFAULT_DELETION_GRACE_PERIOD_DAYS),
            verification_token_ttl: Duration::hours(DEFAULT_VERIFICATION_TOKEN_TTL_HOURS),
            password_reset_token_ttl: Duration::minutes(DEFAULT_PASSWORD_RESET_TOKEN_TTL_MINUTES),
            downgrade_quota_policy: DowngradeQuotaPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// - `FREE_SIMULATION_LIMIT` (default 3)
    /// - `DELETION_GRACE_PERIOD_DAYS` (default 30)
    /// - `VERIFICATION_TOKEN_TTL_HOURS` (default 24)
    /// - `PASSWORD_RESET_TOKEN_TTL_MINUTES` (default 60)
    /// - `DOWNGRADE_QUOTA_POLICY` (`keep_usage` | `reset`, default `keep_usage`)
    pub fn from_env() -> Result<Self, EngineConfigError> {
        let free_simulation_limit: i32 =
            parse_var("FREE_SIMULATION_LIMIT", DEFAULT_FREE_SIMULATION_LIMIT)?;
        if free_simulation_limit < 0 {
            return Err(EngineConfigError::Invalid(
                "FREE_SIMULATION_LIMIT",
                "must not be negative".to_string(),
            ));
        }

        let grace_days: i64 =
            parse_var("DELETION_GRACE_PERIOD_DAYS", DEFAULT_DELETION_GRACE_PERIOD_DAYS)?;
        if grace_days <= 0 {
            return Err(EngineConfigError::Invalid(
                "DELETION_GRACE_PERIOD_DAYS",
                "must be at least 1".to_string(),
            ));
        }

        let verification_hours: i64 =
            parse_var("VERIFICATION_TOKEN_TTL_HOURS", DEFAULT_VERIFICATION_TOKEN_TTL_HOURS)?;
        let reset_minutes: i64 = parse_var(
            "PASSWORD_RESET_TOKEN_TTL_MINUTES",
            DEFAULT_PASSWORD_RESET_TOKEN_TTL_MINUTES,
        )?;

        let downgrade_quota_policy = match env::var("DOWNGRADE_QUOTA_POLICY") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| EngineConfigError::Invalid("DOWNGRADE_QUOTA_POLICY", e))?,
            Err(_) => DowngradeQuotaPolicy::default(),
        };

        Ok(Self {
            free_simulation_limit,
            deletion_grace_period: Duration::days(grace_days),
            verification_token_ttl: Duration::hours(verification_hours),
            password_reset_token_ttl: Duration::minutes(reset_minutes),
            downgrade_quota_policy,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, EngineConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| EngineConfigError::Invalid(name, format!("could not parse {:?}", raw))),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
