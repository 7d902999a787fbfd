//! Host a game.

use anyhow::{Context, Result};
use numduel_peer::PeerConfig;

use super::console;

/// Run the host command.
pub async fn run(config: &PeerConfig) -> Result<()> {
    let listener = numduel_peer::bind(config)
        .await
        .with_context(|| format!("Failed to listen on {}", config.network.bind_address))?;

    println!("=== numduel host ===");
    println!("Listening on {}", listener.local_addr()?);
    println!("Waiting for an opponent...");

    let (handle, events) = numduel_peer::host(&listener, config)
        .await
        .context("Failed to accept a client")?;
    drop(listener);

    println!("Opponent connected. You are Player 1 and play first.");
    console::run(handle, events).await
}
