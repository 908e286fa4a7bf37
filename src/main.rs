//! Capper Tracker server.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the pick store and serves the HTTP API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use capper_tracker::api::{self, ApiState};
use capper_tracker::config::AppConfig;
use capper_tracker::storage::JsonStore;

const BANNER: &str = r#"
  ____                              _____               _
 / ___|__ _ _ __  _ __   ___ _ __  |_   _| __ __ _  ___| | _____ _ __
| |   / _` | '_ \| '_ \ / _ \ '__|   | || '__/ _` |/ __| |/ / _ \ '__|
| |__| (_| | |_) | |_) |  __/ |      | || | | (_| | (__|   <  __/ |
 \____\__,_| .__/| .__/ \___|_|      |_||_|  \__,_|\___|_|\_\___|_|
           |_|   |_|

  Pick grading and leaderboards, v0.1.0
"#;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default(CONFIG_PATH)?;

    init_logging();

    println!("{BANNER}");
    info!(
        port = cfg.server.port,
        store = %cfg.storage.path,
        default_window = %cfg.leaderboard.default_window,
        "Capper Tracker starting up"
    );

    // -- Secrets and store -----------------------------------------------

    let owner_token = AppConfig::resolve_secret(&cfg.auth.owner_token_env)?;
    let webhook_secret = AppConfig::resolve_secret(&cfg.auth.webhook_secret_env)?;
    let store = JsonStore::open(&cfg.storage.path).await?;

    let state = Arc::new(ApiState {
        repo: Arc::new(store),
        owner_token,
        webhook_secret,
        default_window: cfg.leaderboard.default_window,
        day_offset: cfg.leaderboard.day_offset()?,
        cors_allow_origin: cfg.server.cors_allow_origin.clone(),
    });

    // -- Serve -----------------------------------------------------------

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received.");
    };

    api::serve(state, cfg.server.port, shutdown).await?;
    info!("Capper Tracker shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("capper_tracker=info"));

    let json_logging = std::env::var("CAPPER_LOG_JSON").is_ok();

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
