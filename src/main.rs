//! kickoff daemon.
//!
//! Loads the config, builds the application context, keeps the active RPC
//! endpoint healthy in the background, serves the admin API, and rolls
//! seasons over when they expire.

use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use kickoff::admin::setup_admin_router;
use kickoff::config::validation::validate_config;
use kickoff::config::{load_config, ConfigError, KickoffConfig};
use kickoff::lifecycle::{wait_for_signal, Shutdown};
use kickoff::observability::{logging, metrics};
use kickoff::AppContext;

/// How often expired seasons and stale nonces are checked for.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "kickoff", version, about = "RPC failover and game services daemon")]
struct Args {
    /// Path to the TOML config file.
    #[arg(short, long, env = "KICKOFF_CONFIG")]
    config: Option<PathBuf>,
}

fn load(args: &Args) -> Result<KickoffConfig, ConfigError> {
    match &args.config {
        Some(path) => load_config(path),
        None => {
            let config = KickoffConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kickoff: {}", e);
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "kickoff starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let ctx = Arc::new(AppContext::build(config)?);
    if ctx.seasons.current_season()?.is_none() {
        ctx.seasons.start_first_season("Season 1", Utc::now())?;
    }

    ctx.failover.start_periodic_checks(ctx.config.failover.check_interval());

    let shutdown = Arc::new(Shutdown::new());
    let maintenance = spawn_maintenance(ctx.clone(), shutdown.clone());

    let admin = if ctx.config.admin.enabled {
        let listener = TcpListener::bind(&ctx.config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(ctx.clone());
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.wait().await })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API server failed");
            }
        }))
    } else {
        None
    };

    wait_for_signal().await;
    shutdown.trigger();
    ctx.failover.stop_periodic_checks();

    if let Some(admin) = admin {
        let _ = admin.await;
    }
    let _ = maintenance.await;

    if let Err(e) = ctx.flush_all() {
        tracing::error!(error = %e, "Shutdown flush incomplete");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Roll expired seasons over and drop stale sign-in nonces until shutdown.
fn spawn_maintenance(ctx: Arc<AppContext>, shutdown: Arc<Shutdown>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    let now = Utc::now();
                    ctx.auth.purge_expired_nonces(now);
                    match ctx.seasons.roll_over_if_expired(now) {
                        Ok(Some(report)) => {
                            tracing::info!(season_id = report.started.id, "Season rolled over");
                            if let Err(e) = ctx.flush_all() {
                                tracing::error!(error = %e, "Flush after season roll-over failed");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::error!(error = %e, "Season roll-over failed"),
                    }
                }
            }
        }
        tracing::debug!("Maintenance task stopped");
    })
}
