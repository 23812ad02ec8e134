//! COINFLIP: coin-flip betting session engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the per-wallet session registry, and serves the JSON API
//! until Ctrl+C.

use anyhow::Result;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use coinflip::config::AppConfig;
use coinflip::registry::SessionRegistry;
use coinflip::server::{self, routes::ServerState};

const BANNER: &str = r#"
  ____ ___ ___ _   _ _____ _     ___ ____
 / ___/ _ \_ _| \ | |  ___| |   |_ _|  _ \
| |  | | | | ||  \| | |_  | |    | || |_) |
| |__| |_| | || |\  |  _| | |___ | ||  __/
 \____\___/___|_| \_|_|   |_____|___|_|

  Heads or tails, one stake at a time
  v0.1.0
"#;

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("COINFLIP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config_found = Path::new(&config_path).exists();
    let cfg = if config_found {
        AppConfig::load(&config_path)?
    } else {
        AppConfig::default()
    };

    init_logging();

    println!("{BANNER}");
    if !config_found {
        warn!(path = %config_path, "Config file not found, using defaults");
    }
    info!(
        initial_balance = %cfg.session.initial_balance,
        spin_delay_ms = cfg.session.spin_delay_ms,
        seeded = cfg.session.rng_seed.is_some(),
        normal_stakes = ?cfg.stakes.normal,
        elevated_stakes = ?cfg.stakes.elevated,
        "COINFLIP starting up"
    );

    if !cfg.server.enabled {
        warn!("API server disabled in config; nothing to serve. Exiting.");
        return Ok(());
    }

    let registry = SessionRegistry::new(&cfg);
    let state = Arc::new(ServerState::new(registry));

    let host: IpAddr = cfg.server.host.parse()?;
    let addr = SocketAddr::new(host, cfg.server.port);

    server::serve(state.clone(), addr, shutdown_signal()).await?;

    info!(
        sessions = state.registry.len().await,
        "COINFLIP shut down cleanly."
    );
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received.");
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coinflip=info,tower_http=info"));

    let json_logging = std::env::var("COINFLIP_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
