use std::time::Duration;

use photo_booth::{
    config::AppConfig,
    services::{storage::R2ImageStore, sweep},
};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let once = std::env::args().skip(1).any(|arg| arg == "--once");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let store = R2ImageStore::new(
        &config.r2_bucket,
        &config.r2_endpoint,
        &config.r2_access_key,
        &config.r2_secret_key,
        &config.r2_public_url,
    )
    .expect("Failed to initialize R2 image store");

    let max_age = chrono::Duration::hours(config.sweep_max_age_hours);
    let interval = Duration::from_secs(config.sweep_interval_secs);

    tracing::info!(
        max_age_hours = config.sweep_max_age_hours,
        interval_secs = config.sweep_interval_secs,
        once,
        "Starting temporary image sweeper"
    );

    loop {
        if let Err(e) = sweep::sweep_expired(&store, max_age, chrono::Utc::now()).await {
            tracing::error!(error = %e, "Sweep failed, will retry next interval");
        }

        if once {
            break;
        }
        sleep(interval).await;
    }
}
