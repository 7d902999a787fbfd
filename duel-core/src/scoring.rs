//! The scoring engine.
//!
//! [`resolve`] folds a play into a score. It is a pure function: no
//! randomness, no state, no panics on any input.

use numduel_types::{Card, CardKind, ExtraOperator, FieldModifier, Operator, Skill};
use thiserror::Error;

/// Apply `played` to `current` under `field` and return the new score.
///
/// Order: the field transforms the Number value, the ExtraOperator transforms
/// the score, then the Operator combines the score with the Number. Skill
/// cards are ignored. Only the first card of each kind counts.
pub fn resolve(current: i64, played: &[Card], field: FieldModifier) -> i64 {
    let number = played.iter().find_map(Card::number);
    let operator = played.iter().find_map(|c| match c {
        Card::Operator(op) => Some(*op),
        _ => None,
    });
    let extra = played.iter().find_map(|c| match c {
        Card::ExtraOperator(extra) => Some(*extra),
        _ => None,
    });

    let mut score = current;
    if let Some(extra) = extra {
        score = match extra {
            ExtraOperator::Square => score.saturating_mul(score),
            ExtraOperator::SquareRoot => floor_sqrt(score),
        };
    }

    if let (Some(op), Some(n)) = (operator, number) {
        let n = apply_field(n, field);
        score = match op {
            Operator::Add => score.saturating_add(n),
            Operator::Subtract => score.saturating_sub(n),
            Operator::Multiply => score.saturating_mul(n),
            Operator::Divide if n == 0 => score,
            Operator::Divide => score.saturating_div(n),
        };
    }
    score
}

/// The Number value after the field transform.
pub fn apply_field(value: i64, field: FieldModifier) -> i64 {
    match field {
        FieldModifier::Normal => value,
        FieldModifier::Square => value.saturating_mul(value),
        FieldModifier::SquareRoot => floor_sqrt(value),
    }
}

/// `floor(√n)`, with negative inputs mapped to 0.
pub fn floor_sqrt(n: i64) -> i64 {
    if n <= 0 {
        return 0;
    }
    let mut root = (n as f64).sqrt() as i64;
    // f64 loses precision above 2^53
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= n) {
        root += 1;
    }
    root
}

/// Whether `hand` holds any play [`Play::from_cards`] would accept.
pub fn has_legal_play(hand: &[Card]) -> bool {
    let has = |kind| hand.iter().any(|c| c.kind() == kind);
    has(CardKind::Skill) || (has(CardKind::Number) && has(CardKind::Operator))
}

/// Reasons a set of cards is not a legal play.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    /// No cards selected.
    #[error("no cards selected")]
    Empty,

    /// Two cards of the same kind.
    #[error("more than one {0:?} card")]
    DuplicateKind(CardKind),

    /// A Number card without an Operator card.
    #[error("a number card needs an operator card")]
    MissingOperator,

    /// An Operator card without a Number card.
    #[error("an operator card needs a number card")]
    MissingNumber,

    /// An ExtraOperator card without the Number and Operator pair.
    #[error("an extra operator card needs a number and an operator card")]
    ExtraOperatorWithoutPair,
}

/// A validated play: at most one card per kind, in a legal combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Play {
    cards: Vec<Card>,
    skill: Option<Skill>,
    arithmetic: bool,
}

impl Play {
    /// Validate a selection of cards.
    pub fn from_cards(cards: Vec<Card>) -> Result<Self, PlayError> {
        if cards.is_empty() {
            return Err(PlayError::Empty);
        }

        let mut seen = [0usize; 4];
        for card in &cards {
            let slot = card.kind() as usize;
            seen[slot] += 1;
            if seen[slot] > 1 {
                return Err(PlayError::DuplicateKind(card.kind()));
            }
        }

        let count = |kind: CardKind| seen[kind as usize] > 0;
        let number = count(CardKind::Number);
        let operator = count(CardKind::Operator);
        match (number, operator) {
            (true, false) => return Err(PlayError::MissingOperator),
            (false, true) => return Err(PlayError::MissingNumber),
            _ => {}
        }
        let arithmetic = number && operator;
        if count(CardKind::ExtraOperator) && !arithmetic {
            return Err(PlayError::ExtraOperatorWithoutPair);
        }

        let skill = cards.iter().find_map(Card::skill);
        Ok(Self {
            cards,
            skill,
            arithmetic,
        })
    }

    /// Every card in the play.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Take the cards back out.
    pub fn into_cards(self) -> Vec<Card> {
        self.cards
    }

    /// The skill card, if any.
    pub fn skill(&self) -> Option<Skill> {
        self.skill
    }

    /// Whether the play contains a Number and Operator pair.
    pub fn is_arithmetic(&self) -> bool {
        self.arithmetic
    }

    /// Whether the play holds nothing but a skill card.
    pub fn is_skill_only(&self) -> bool {
        !self.arithmetic && self.skill.is_some()
    }
}
