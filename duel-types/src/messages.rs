//! Protocol messages for numduel.
//!
//! These are the payloads carried inside an [`Envelope`](crate::Envelope).
//! On the wire a message is a JSON object whose `type` field names the
//! variant; the remaining camelCase fields depend on that type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Card, CardKind, FieldModifier, PlayerIndex, WireError};

/// All possible protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Client announces it is ready to start
    PlayerReady(PlayerReady),
    /// Host starts the session and hands the client its initial hand
    GameStart(GameStart),
    /// Host announces the target number
    TargetNumber(TargetNumber),
    /// Client asks the host to (re)send the target number
    RequestTargetNumber(RequestTargetNumber),
    /// Draw request (client) or draw announcement (host)
    DrawCard(DrawCard),
    /// Host answers a client draw with the literal cards drawn
    DrawCardResponse(DrawCardResponse),
    /// Host pushes the remaining per-kind deck counts
    DeckUpdate(DeckCounts),
    /// A number/operator play, optionally with extra operator and skill
    Turn(Turn),
    /// A skill card played on its own
    Skill(SkillCast),
    /// Sets or clears a player's frozen flag on the receiving replica
    FreezeStatus(FreezeStatus),
    /// Authoritative scores after a Mirror
    ScoreSync(ScoreSync),
    /// A player gives up their turn (voluntarily or because frozen)
    SkipTurn(SkipTurn),
    /// The session has ended
    GameOver(GameOver),
}

impl Message {
    /// The discriminator of this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::PlayerReady(_) => MessageType::PlayerReady,
            Message::GameStart(_) => MessageType::GameStart,
            Message::TargetNumber(_) => MessageType::TargetNumber,
            Message::RequestTargetNumber(_) => MessageType::RequestTargetNumber,
            Message::DrawCard(_) => MessageType::DrawCard,
            Message::DrawCardResponse(_) => MessageType::DrawCardResponse,
            Message::DeckUpdate(_) => MessageType::DeckUpdate,
            Message::Turn(_) => MessageType::Turn,
            Message::Skill(_) => MessageType::Skill,
            Message::FreezeStatus(_) => MessageType::FreezeStatus,
            Message::ScoreSync(_) => MessageType::ScoreSync,
            Message::SkipTurn(_) => MessageType::SkipTurn,
            Message::GameOver(_) => MessageType::GameOver,
        }
    }
}

/// Message type discriminator, matching the wire `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// `PlayerReady`
    PlayerReady,
    /// `GameStart`
    GameStart,
    /// `TargetNumber`
    TargetNumber,
    /// `RequestTargetNumber`
    RequestTargetNumber,
    /// `DrawCard`
    DrawCard,
    /// `DrawCardResponse`
    DrawCardResponse,
    /// `DeckUpdate`
    DeckUpdate,
    /// `Turn`
    Turn,
    /// `Skill`
    Skill,
    /// `FreezeStatus`
    FreezeStatus,
    /// `ScoreSync`
    ScoreSync,
    /// `SkipTurn`
    SkipTurn,
    /// `GameOver`
    GameOver,
}

impl MessageType {
    /// Every known type.
    pub const ALL: [MessageType; 13] = [
        MessageType::PlayerReady,
        MessageType::GameStart,
        MessageType::TargetNumber,
        MessageType::RequestTargetNumber,
        MessageType::DrawCard,
        MessageType::DrawCardResponse,
        MessageType::DeckUpdate,
        MessageType::Turn,
        MessageType::Skill,
        MessageType::FreezeStatus,
        MessageType::ScoreSync,
        MessageType::SkipTurn,
        MessageType::GameOver,
    ];

    /// The wire tag.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::PlayerReady => "PlayerReady",
            MessageType::GameStart => "GameStart",
            MessageType::TargetNumber => "TargetNumber",
            MessageType::RequestTargetNumber => "RequestTargetNumber",
            MessageType::DrawCard => "DrawCard",
            MessageType::DrawCardResponse => "DrawCardResponse",
            MessageType::DeckUpdate => "DeckUpdate",
            MessageType::Turn => "Turn",
            MessageType::Skill => "Skill",
            MessageType::FreezeStatus => "FreezeStatus",
            MessageType::ScoreSync => "ScoreSync",
            MessageType::SkipTurn => "SkipTurn",
            MessageType::GameOver => "GameOver",
        }
    }

    /// Look up a wire tag.
    pub fn from_name(name: &str) -> Result<Self, WireError> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| WireError::UnknownMessageType(name.to_string()))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Remaining cards in the authoritative draw pile, per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCounts {
    /// Number cards left.
    pub number_card_count: u32,
    /// Operator cards left.
    pub operator_card_count: u32,
    /// Extra operator cards left.
    pub extra_operator_card_count: u32,
    /// Skill cards left.
    pub skill_card_count: u32,
}

impl DeckCounts {
    /// Count for a single kind.
    pub fn get(&self, kind: CardKind) -> u32 {
        match kind {
            CardKind::Number => self.number_card_count,
            CardKind::Operator => self.operator_card_count,
            CardKind::ExtraOperator => self.extra_operator_card_count,
            CardKind::Skill => self.skill_card_count,
        }
    }

    /// Total cards left.
    pub fn total(&self) -> u32 {
        CardKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

/// The round on which the field modifier is active.
///
/// Chosen once by the host so both replicas derive the same field for every
/// round without any further randomness crossing the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchedule {
    /// The 1-based round during which `modifier` applies.
    pub round: u32,
    /// The modifier in force during that round.
    pub modifier: FieldModifier,
}

impl FieldSchedule {
    /// A schedule that never changes the field.
    pub fn none() -> Self {
        Self {
            round: 0,
            modifier: FieldModifier::Normal,
        }
    }

    /// The field in force during `round`.
    pub fn field_for(&self, round: u32) -> FieldModifier {
        if round == self.round {
            self.modifier
        } else {
            FieldModifier::Normal
        }
    }
}

/// Client is connected and ready to be dealt in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerReady {
    /// Seat of the ready player (always 1 in practice)
    pub player_index: PlayerIndex,
}

/// Session start, sent by the host once both players are ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStart {
    /// Seat that takes the first turn
    pub player_index: PlayerIndex,
    /// The receiving client's initial hand
    pub initial_hand: Vec<Card>,
    /// Number of cards dealt to the host
    pub host_hand_size: u32,
    /// When the field modifier applies
    pub field_schedule: FieldSchedule,
}

/// The host's target number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetNumber {
    /// Sender seat
    pub player_index: PlayerIndex,
    /// The target
    pub target_number: i64,
}

/// Ask the host to send the target number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTargetNumber {
    /// Requesting seat
    pub player_index: PlayerIndex,
}

/// Draw request from the client, or a draw announcement from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCard {
    /// Drawing seat
    pub player_index: PlayerIndex,
    /// Cards requested (client) or drawn (host)
    pub cards_drawn: u32,
}

/// The literal cards the host drew on behalf of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCardResponse {
    /// Seat the cards are for
    pub player_index: PlayerIndex,
    /// How many cards were actually drawn (may be fewer than requested)
    pub cards_drawn: u32,
    /// The cards
    pub drawn_cards: Vec<Card>,
}

/// A play containing a Number and an Operator card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Acting seat
    pub player_index: PlayerIndex,
    /// Every card in the play, skill included
    pub played_cards: Vec<Card>,
    /// The acting player's score after the play, as computed by the sender
    pub result: i64,
    /// Mirrors `result`; kept for the display collaborator
    pub current_number: i64,
    /// The field the sender scored under
    pub current_field: FieldModifier,
}

/// A skill card played on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCast {
    /// Acting seat
    pub player_index: PlayerIndex,
    /// The skill card
    pub skill_card: Card,
    /// Whether the effect was applied by the sender
    pub is_skill_success: bool,
}

/// Frozen flag delta for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeStatus {
    /// The player whose flag changes
    pub player_index: PlayerIndex,
    /// New value of the flag
    pub is_frozen: bool,
}

/// Both scores, after a Mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSync {
    /// Seat that caused the change
    pub player_index: PlayerIndex,
    /// Scores indexed by seat
    pub player_scores: [i64; 2],
}

/// A player gives up their turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipTurn {
    /// Skipping seat
    pub player_index: PlayerIndex,
    /// `true` when forced by a freeze, `false` for a voluntary pass
    pub skip_turn: bool,
}

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    /// A player's score reached the target.
    TargetReached,
    /// The round limit was hit; closest score wins.
    RoundsExhausted,
}

/// Session end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOver {
    /// Winning seat, `null` for a draw
    #[serde(rename = "playerIndex")]
    pub winner: Option<PlayerIndex>,
    /// Final scores indexed by seat
    pub player_scores: [i64; 2],
    /// Why the session ended
    pub reason: GameOverReason,
}
