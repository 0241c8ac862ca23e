//! Worker configuration

use std::env;

use retirezest_entitlement::{EngineConfig, EngineConfigError};

/// Hourly, on the hour (sec min hour day month weekday)
pub const DEFAULT_PURGE_SCHEDULE: &str = "0 0 * * * *";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Cron expression for the purge sweep
    pub purge_schedule: String,
    pub engine: EngineConfig,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, WorkerConfigError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| WorkerConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            purge_schedule: env::var("PURGE_SCHEDULE")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_PURGE_SCHEDULE.to_string()),
            engine: EngineConfig::from_env()?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error(transparent)]
    Engine(#[from] EngineConfigError),
}
