//! Error types for game sessions.

use numduel_types::{Card, MessageType};
use thiserror::Error;

use crate::scoring::PlayError;

/// A local action was refused. No traffic was generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The game has not started yet.
    #[error("the game has not started")]
    NotStarted,

    /// The session is over or aborted.
    #[error("the game is over")]
    GameOver,

    /// Another player is acting.
    #[error("it is not your turn")]
    NotYourTurn,

    /// The local player is frozen this turn.
    #[error("you are frozen this turn")]
    Frozen,

    /// A request to the host is still unanswered.
    #[error("waiting for the host to answer a request")]
    RequestPending,

    /// The local player already drew this turn.
    #[error("already drew this turn")]
    AlreadyDrawn,

    /// Passing is only allowed without a legal play.
    #[error("a legal play is available")]
    LegalPlayAvailable,

    /// A selected card is not in the hand.
    #[error("card not in hand: {0}")]
    NotInHand(Card),

    /// The selected cards do not form a legal play.
    #[error("invalid play: {0}")]
    InvalidPlay(#[from] PlayError),

    /// The action belongs to the other role.
    #[error("only the {0} may do this")]
    WrongRole(&'static str),

    /// Setup already happened.
    #[error("the session is already set up")]
    AlreadyStarted,
}

/// A remote envelope could not be applied. The session is aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The peer sent something inconsistent with the replicated state.
    #[error("protocol violation in {message_type}: {reason}")]
    ProtocolViolation {
        /// Type of the offending message.
        message_type: MessageType,
        /// What was wrong with it.
        reason: String,
    },
}
