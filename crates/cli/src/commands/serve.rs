//! `animus serve` — Start the HTTP gateway.

use animus_config::AppConfig;
use std::path::PathBuf;

pub async fn run(
    port_override: Option<u16>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => {
            AppConfig::load_from(&path).map_err(|e| format!("Failed to load config: {e}"))?
        }
        None => AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?,
    };

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("animus gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Rate limit: {} requests / {}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );
    println!("   Store: {}", config.store.backend);

    animus_gateway::start(config).await?;

    Ok(())
}
