//! Server entrypoint: config, database, router, graceful shutdown.

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use pharma_db::{Database, DbConfig};
use pharma_server::config::ServerConfig;
use pharma_server::state::AppState;
use pharma_server::{build_app, seed_admin};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pharma_server=debug,pharma_db=debug")),
        )
        .init();

    let config = ServerConfig::load()?;
    info!(port = config.http_port, db = %config.database_path, "Starting pharmacy server");

    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    seed_admin(&db).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let app = build_app(AppState::new(db.clone(), config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, closing database");
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received shutdown signal");
}
