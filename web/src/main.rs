//! Server binary: configuration, wiring, graceful shutdown.

use marquee_core::access::AccessControl;
use marquee_core::cache::NoopInvalidator;
use marquee_core::extensions::ExtensionRegistry;
use marquee_core::CatalogService;
use marquee_postgres::{connect, PgAccessControl, PgAvailability, PgCatalogStore};
use marquee_web::config::Config;
use marquee_web::{router, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.bind_addr, "starting marquee server");

    let pool = connect(&config.database_url, config.max_connections).await?;
    let store = PgCatalogStore::new(pool.clone());
    store.migrate().await?;

    let access: Arc<dyn AccessControl> = Arc::new(PgAccessControl::new(pool.clone()));
    let service = CatalogService::new(
        Arc::new(store),
        access.clone(),
        Arc::new(NoopInvalidator),
        Arc::new(PgAvailability::new(pool)),
        ExtensionRegistry::new(),
    );
    let state = AppState::new(Arc::new(service), access);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves once the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received, draining connections");
}
