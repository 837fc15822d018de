// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use citizen_registry::{telemetry, Registry, RegistryConfig};
use std::env;
use tracing::warn;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    // REGISTRY_BIND_ADDR is server-only
    let config = RegistryConfig::dashboard_from_env().context("invalid configuration")?;

    if args.len() > 1 && args[1] == "init" {
        // Schema-only mode
        run_init(&config)?;
    } else {
        // UI mode (default)
        run_ui_mode(&config)?;
    }

    Ok(())
}

fn run_init(config: &RegistryConfig) -> Result<()> {
    telemetry::init_stdout();

    println!("🗄️  Citizen Registry - schema setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let registry = Registry::open(config).context("failed to open database")?;
    registry.initialize_schema()?;
    println!("✓ Database ready at {}", config.db_path.display());

    let insights = registry.get_business_insights()?;
    println!("✓ Citizens enrolled:      {}", insights.total_enrolled);
    println!("✓ Auth attempts logged:   {}", insights.total_auth_attempts);
    println!("✓ De-duplication alerts:  {}", insights.dedup_conflicts);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &RegistryConfig) -> Result<()> {
    telemetry::init_file(&config.log_file)
        .with_context(|| format!("cannot open log file {}", config.log_file.display()))?;

    let registry = Registry::open(config).context("failed to open database")?;

    // Non-fatal: the dashboard still renders and shows the failure on refresh
    if let Err(e) = registry.initialize_schema() {
        warn!(error = %e, "schema setup failed");
    }

    let mut app = ui::App::new(registry, config.failed_auth_alert_threshold);
    ui::run_ui(&mut app)?;

    println!("\n✅ Dashboard closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &RegistryConfig) -> Result<()> {
    warn!("terminal dashboard not compiled in");
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin registry-server --features server");
    std::process::exit(1);
}
