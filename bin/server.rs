// Citizen Registry - Web Server
// REST API with Axum over the shared data access layer

use anyhow::{Context, Result};
use citizen_registry::server::{build_router, AppState};
use citizen_registry::{telemetry, Registry, RegistryConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_stdout();

    let config = RegistryConfig::from_env().context("invalid configuration")?;

    let registry = Registry::open(&config).context("failed to open database")?;

    // Non-fatal: the next startup tries again
    if let Err(e) = registry.initialize_schema() {
        warn!(error = %e, "schema setup failed");
    }

    let state = AppState {
        registry,
        failed_auth_alert_threshold: config.failed_auth_alert_threshold,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %listener.local_addr()?, db = %config.db_path.display(), "server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
