//! # duel-types
//!
//! Card model and wire format types for the numduel protocol.
//!
//! This crate provides the foundational types shared by every numduel crate:
//! - [`Card`], [`CardKind`] and the per-kind variants - the card model
//! - [`PlayerIndex`], [`Seq`] - seat and ordering types
//! - [`Message`] - protocol messages (PlayerReady, Turn, Skill, etc.)
//! - [`Envelope`] - the frame body wrapping a message with sequencing metadata
//! - [`frame`] - length-prefix framing constants and helpers
//! - [`WireError`] - error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod card;
mod envelope;
mod error;
pub mod frame;
mod ids;
mod messages;

pub use card::{Card, CardKind, ExtraOperator, FieldModifier, Operator, Skill};
pub use envelope::{Envelope, PROTOCOL_VERSION};
pub use error::WireError;
pub use ids::{PlayerIndex, Seq};
pub use messages::{
    DeckCounts, DrawCard, DrawCardResponse, FieldSchedule, FreezeStatus, GameOver,
    GameOverReason, GameStart, Message, MessageType, PlayerReady, RequestTargetNumber,
    ScoreSync, SkillCast, SkipTurn, TargetNumber, Turn,
};
