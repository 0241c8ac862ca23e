//! Shared application state

use std::sync::Arc;

use retirezest_entitlement::LifecycleEngine;

use crate::{
    auth::{JwtManager, JwtSessionProvider, SessionProvider},
    config::Config,
    email::Mailer,
};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: LifecycleEngine,
    pub sessions: Arc<dyn SessionProvider>,
    pub jwt: Arc<JwtManager>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire JWT sessions from the configured secret
    pub fn new(config: Config, engine: LifecycleEngine, mailer: Arc<dyn Mailer>) -> Self {
        let jwt = Arc::new(JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours));
        let sessions: Arc<dyn SessionProvider> = Arc::new(JwtSessionProvider::new(jwt.clone()));

        Self {
            engine,
            sessions,
            jwt,
            mailer,
            config: Arc::new(config),
        }
    }
}
