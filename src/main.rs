//! Mailroom Tracking Service — entry point.
//!
//! Wires configuration, logging, the store and write queue, and the HTTP
//! server together, in the required startup order.

use tracing_subscriber::{EnvFilter, fmt};

use mailroom_api::AppState;
use mailroom_core::config::AppConfig;
use mailroom_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.is_production() {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt().pretty().with_env_filter(filter).with_target(true).init();
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(env = ?config.app_env, "Starting mailroom tracking service");

    // Store open runs the schema, migrations, and the expired-session
    // sweep; AppState::build then starts the write queue and wires the
    // services before the listener opens.
    let state = AppState::build(config)?;

    mailroom_api::server::run(state).await
}
