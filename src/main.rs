use std::sync::Arc;
use std::time::Duration;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use backend::{
    auth::session::{PgSessionStore, SessionManager},
    bootstrap, config::AppConfig, db, routes, s3::build_client, state::AppState,
    storage::S3Storage,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        s3_bucket = %config.s3_bucket,
        "loaded backend configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;

    {
        let mut conn = pool.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow::anyhow!("failed to run migrations: {err}"))?;
        bootstrap::ensure_first_admin(&mut conn, &config)?;
    }

    let s3_client = build_client(&config).await?;
    let storage = S3Storage::new(s3_client, config.s3_bucket.clone());
    if let Err(err) = storage.ensure_bucket().await {
        tracing::warn!(error = %err, "object storage bucket check failed");
    }

    let sessions = SessionManager::new(
        Arc::new(PgSessionStore::new(pool.clone())),
        Duration::from_secs(config.session_ttl_days as u64 * 24 * 60 * 60),
    );

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(pool, config, Arc::new(storage), sessions);
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("received shutdown signal");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
