use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_mileage::config::environment::{EnvironmentConfig, StorageBackend};
use fleet_mileage::repositories::{FleetStore, MemoryFleetStore, PgFleetStore};
use fleet_mileage::{create_app, database, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fleet_mileage=debug,tower_http=info")),
        )
        .init();

    info!("🚚 Fleet Mileage Service");
    info!("========================");

    let config = EnvironmentConfig::from_env()?;
    info!(
        "⚙️ Limit {} miles, warning margin {} miles, cycle mode {}",
        config.mileage_limit, config.warning_margin, config.cycle_mode
    );

    let store: Arc<dyn FleetStore> = match (config.storage_backend, config.database_url.as_deref()) {
        (StorageBackend::Postgres, Some(url)) => {
            let pool = database::connect(url).await.map_err(|e| {
                error!("❌ Database unavailable: {:#}", e);
                e
            })?;
            Arc::new(PgFleetStore::new(pool))
        }
        (StorageBackend::Postgres, None) => anyhow::bail!("DATABASE_URL must be set when STORAGE_BACKEND=postgres"),
        (StorageBackend::Memory, _) => {
            warn!("⚠️ Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryFleetStore::new())
        }
    };

    let state = AppState::new(config.clone(), store).context("failed to build application state")?;
    let app = create_app(state);

    let addr: SocketAddr = config.server_url().parse().context("invalid HOST/PORT")?;
    info!("🌐 Server listening on http://{}", addr);
    info!("🔍 Endpoints:");
    info!("   POST   /api/mileage - Record odometer reading");
    info!("   GET    /api/mileage/:vehicle/history - Mileage history");
    info!("   GET    /api/alerts - List alerts");
    info!("   PATCH  /api/alerts/:id/acknowledge - Acknowledge alert");
    info!("   PUT    /api/alerts/acknowledge-all - Acknowledge all alerts");
    info!("   GET    /api/vehicles - List vehicles");
    info!("   POST   /api/vehicles - Register vehicle");
    info!("   GET    /api/vehicles/:vehicle - Get vehicle");
    info!("   DELETE /api/vehicles/:vehicle - Delete vehicle");
    info!("   GET    /api/maintenance - List maintenance");
    info!("   POST   /api/maintenance - Record maintenance");
    info!("   GET    /api/settings - Fleet settings");
    info!("   PUT    /api/settings - Update fleet settings");
    info!("   GET    /api/activity - Recent activity");
    info!("   GET    /health, /metrics");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Server error: {}", e);
            e
        })?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Ctrl+C received, shutting down...");
        },
        _ = terminate => {
            info!("🛑 Termination signal received, shutting down...");
        },
    }
}
