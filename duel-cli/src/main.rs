//! # numduel
//!
//! Terminal front end for the numduel two-player arithmetic card game.
//!
//! ## Commands
//!
//! - `host`: Listen for one opponent and deal the game
//! - `join`: Connect to a host
//!
//! ## Example
//!
//! ```bash
//! # On the first machine
//! numduel host --bind 0.0.0.0:7777
//!
//! # On the second machine
//! numduel join --addr 192.168.1.20:7777
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change the level (default: `info`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use numduel_peer::PeerConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{host, join};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "numduel.toml";

/// Two-player arithmetic card game over TCP.
#[derive(Parser, Debug)]
#[command(name = "numduel")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Seconds to wait for a draw or target request before giving up
    #[arg(long, global = true)]
    request_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Host a game and wait for one opponent
    Host {
        /// Address to listen on
        #[arg(long, short)]
        bind: Option<String>,

        /// Fixed seed for a reproducible deal
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Join a hosted game
    Join {
        /// Host address
        #[arg(long, short)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(secs) = cli.request_timeout {
        config.timeouts.request_timeout_secs = secs;
    }

    match cli.command {
        Commands::Host { bind, seed } => {
            if let Some(bind) = bind {
                config.network.bind_address = bind;
            }
            if seed.is_some() {
                config.network.seed = seed;
            }
            host::run(&config).await?;
        }
        Commands::Join { addr } => {
            let addr = addr.unwrap_or_else(|| config.network.connect_address.clone());
            join::run(&addr, &config).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the explicit config, else `numduel.toml` if present, else defaults.
fn load_config(path: Option<&Path>) -> Result<PeerConfig> {
    if let Some(path) = path {
        return PeerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let fallback = Path::new(DEFAULT_CONFIG_FILE);
    if fallback.exists() {
        tracing::info!("using {}", DEFAULT_CONFIG_FILE);
        return PeerConfig::from_file(fallback).context("Failed to load numduel.toml");
    }
    Ok(PeerConfig::default())
}
