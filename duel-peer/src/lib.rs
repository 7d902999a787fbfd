//! # duel-peer
//!
//! Async runtime for one numduel peer over TCP.
//!
//! This crate provides:
//! - [`FrameReader`] / [`FrameWriter`] - length-prefixed envelope framing
//! - [`PeerHandle`] - drives a session running in its own task
//! - [`host`] / [`join`] - TCP entry points for both roles
//! - [`PeerConfig`] - TOML configuration
//!
//! The game logic itself lives in `numduel-core`; this crate only moves
//! envelopes between the socket and the session and enforces the request
//! deadline.
//!
//! # Example
//!
//! ```ignore
//! let config = PeerConfig::default();
//! let (handle, mut events) = numduel_peer::join("127.0.0.1:7777", &config).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod actor;
pub mod config;
pub mod error;
pub mod framing;
mod handle;
mod net;

pub use config::{ConfigError, NetworkConfig, PeerConfig, TimeoutConfig};
pub use error::{PeerError, Result};
pub use framing::{FrameReader, FrameWriter};
pub use handle::{spawn, Events, PeerHandle};
pub use net::{bind, host, join};
