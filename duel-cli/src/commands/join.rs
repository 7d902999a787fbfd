//! Join a hosted game.

use anyhow::{Context, Result};
use numduel_peer::PeerConfig;

use super::console;

/// Run the join command.
pub async fn run(addr: &str, config: &PeerConfig) -> Result<()> {
    println!("=== numduel join ===");
    println!("Connecting to {addr}...");

    let (handle, events) = numduel_peer::join(addr, config)
        .await
        .with_context(|| format!("Failed to join {addr}"))?;

    println!("Connected. You are Player 2; the host plays first.");
    console::run(handle, events).await
}
