use anyhow::{Context, Result};

use keyword_radar::config::Config;
use keyword_radar::server::RadarServer;

pub async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let server = RadarServer::new(&config).context("Failed to initialize API server")?;

    println!(
        "keyword-radar API listening on http://{}:{}",
        config.server.host, config.server.port
    );
    println!("Press Ctrl+C to stop");

    server
        .start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("API server failed")?;

    Ok(())
}
