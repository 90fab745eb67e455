//! Focus Monitor - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Focus Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting webcam distraction detector...");

    let config = AppConfig::load()?;
    run_server(config).await?;

    Ok(())
}
