//! TCP entry points.

use numduel_core::GameSession;
use tokio::net::{TcpListener, TcpStream};

use crate::config::PeerConfig;
use crate::error::{PeerError, Result};
use crate::handle::{spawn, Events, PeerHandle};

/// Bind the host's listener.
pub async fn bind(config: &PeerConfig) -> Result<TcpListener> {
    let listener = TcpListener::bind(&config.network.bind_address).await?;
    tracing::info!(addr = %listener.local_addr()?, "waiting for a client");
    Ok(listener)
}

/// Accept exactly one client and run the host session over it.
pub async fn host(listener: &TcpListener, config: &PeerConfig) -> Result<(PeerHandle, Events)> {
    let (stream, addr) = listener.accept().await?;
    tracing::info!(%addr, "client connected");
    stream.set_nodelay(true)?;

    let session = GameSession::host(
        config.rules.clone(),
        config.deck.clone(),
        config.network.seed,
    );
    let (read, write) = stream.into_split();
    Ok(spawn(
        session,
        read,
        write,
        config.timeouts.request_timeout(),
    ))
}

/// Connect to a host and run the client session.
pub async fn join(addr: &str, config: &PeerConfig) -> Result<(PeerHandle, Events)> {
    let stream = tokio::time::timeout(
        config.timeouts.connect_timeout(),
        TcpStream::connect(addr),
    )
    .await
    .map_err(|_| PeerError::ConnectTimeout {
        addr: addr.to_string(),
    })??;
    tracing::info!(%addr, "connected to host");
    stream.set_nodelay(true)?;

    let session = GameSession::client(config.rules.clone());
    let (read, write) = stream.into_split();
    Ok(spawn(
        session,
        read,
        write,
        config.timeouts.request_timeout(),
    ))
}
