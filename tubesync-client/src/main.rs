//! TubeSync headless client
//!
//! Joins a shared-playback room and drives a logging player, taking room
//! commands from stdin.
//!
//! Usage:
//!   cargo run -p tubesync-client -- --url ws://127.0.0.1:8000/ws/demo-room
//!   cargo run -p tubesync-client -- --no-ansi --ping-secs 0

mod config;
mod console;
mod events;
mod metrics;

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::BufReader;
use tracing::{error, info};

use tubesync_core::{AdapterConfig, ConnectionAdapter};

use crate::config::ClientConfig;
use crate::console::Console;
use crate::events::{LoggingPlayer, MetricsObserver};
use crate::metrics::Metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tubesync_core=debug".parse()?)
                .add_directive("tubesync_client=info".parse()?),
        )
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .init();

    // Shared metrics state
    let metrics = Arc::new(RwLock::new(Metrics::new()));

    let adapter = ConnectionAdapter::websocket(AdapterConfig {
        ping_interval: config.ping_interval,
    });
    adapter.set_player(Arc::new(LoggingPlayer::new(metrics.clone())));
    adapter.set_observer(Arc::new(MetricsObserver::new(metrics.clone())));

    if config.auto_connect {
        // Not fatal: `connect` in the console retries
        if let Err(e) = adapter.connect(&config.url).await {
            error!("Could not join {}: {}", config.url, e);
        }
    }

    info!("Type 'help' for commands");
    let console = Console::new(&adapter, metrics.clone(), config.url.clone());
    console.run(BufReader::new(tokio::io::stdin())).await?;

    adapter.disconnect();
    info!("Session ended after {}", metrics.read().uptime());
    Ok(())
}
