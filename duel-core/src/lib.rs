//! # duel-core
//!
//! Pure game logic for numduel (no I/O, instant tests).
//!
//! This crate implements the deck, the scoring engine, the turn state machine
//! and the replicated game session without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! Every module here is **pure**: a [`GameSession`] takes a local action or a
//! remote [`Envelope`](numduel_types::Envelope) and returns [`Output`]s to
//! send or display. This enables:
//! - Instant unit tests (two sessions wired back to back, no sockets)
//! - Deterministic behavior (a seeded host deals the same game every time)
//! - Both replicas stepping through the same transitions
//!
//! The actual I/O (TCP framing, timeouts, the terminal) is performed by
//! `duel-peer` and `duel-cli`, which interpret the outputs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deck;
pub mod error;
pub mod rules;
pub mod scoring;
pub mod session;
pub mod state;

pub use deck::{Deck, DeckConfig, DeckMirror, MAX_DECK_SIZE};
pub use error::{ActionError, SessionError};
pub use rules::RulesConfig;
pub use scoring::{has_legal_play, resolve, Play, PlayError};
pub use session::{GameEvent, GameSession, Output, Role, SessionSnapshot};
pub use state::{AbortReason, Advance, Gate, Outcome, PendingRequest, Phase, TurnState};
