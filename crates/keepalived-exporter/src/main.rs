//! Keepalived exporter binary

use keepalived_exporter::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (needed for logging settings)
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Can't use tracing yet - not initialized
            eprintln!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    if config.json_logs() {
        common::logging::init_json_with_level(config.log_level());
    } else {
        common::logging::init_with_level(config.log_level());
    }

    keepalived_exporter::run(config).await?;

    Ok(())
}
