//! RetireZest API server

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use retirezest_api::{
    create_router,
    email::{EmailConfig, ResendMailer},
    AppState, Config,
};
use retirezest_entitlement::{LifecycleEngine, PgAccountStore};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("retirezest_api=info,retirezest_entitlement=info,tower_http=info")
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool =
        retirezest_shared::create_pool(&config.database_url, config.database_max_connections)
            .await
            .context("Failed to connect to database")?;
    let migration_pool = retirezest_shared::create_migration_pool(&config.database_url)
        .await
        .context("Failed to connect to database for migrations")?;
    retirezest_shared::run_migrations(&migration_pool)
        .await
        .context("Failed to run migrations")?;
    migration_pool.close().await;

    let engine = LifecycleEngine::new(Arc::new(PgAccountStore::new(pool)), config.engine.clone());
    let mailer = Arc::new(ResendMailer::new(EmailConfig::from_config(&config)));
    if !config.resend_api_key.is_empty() {
        tracing::info!("Transactional email enabled");
    } else {
        tracing::warn!("RESEND_API_KEY not set, verification and reset emails will be skipped");
    }

    let origin: HeaderValue = config
        .public_url
        .parse()
        .context("PUBLIC_URL is not a valid origin")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, engine, mailer);
    let app = create_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(address = %bind_address, "RetireZest API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
