//! Lunacast WebSocket Server - Entry Point
//!
//! Streams the Moon's RA/Dec to every client connected on the local port.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lunacast::{MoonServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("Starting Lunacast server");

    let config = ServerConfig::default();
    let server = MoonServer::bind(config)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Cannot start listener"))
        .context("failed to start WebSocket server")?;

    tracing::info!("Connect with a WebSocket client to ws://{}", server.local_addr());

    tokio::select! {
        result = server.serve() => {
            result
                .inspect_err(|e| tracing::error!(error = %e, "Listener failed"))
                .context("WebSocket server stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Server shutting down");
        }
    }

    Ok(())
}
