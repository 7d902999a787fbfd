//! The card model.
//!
//! A card is a plain value. Each kind carries only the data that is meaningful
//! for it, so a Number card cannot accidentally carry an operator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A binary operator applied to the acting score and a Number card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `score + n`
    Add,
    /// `score - n`
    Subtract,
    /// `score * n`
    Multiply,
    /// `score / n`, a no-op when `n == 0`
    Divide,
}

impl Operator {
    /// Every operator, in deck-building order.
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    /// Infix symbol used in logs and result lines.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "×",
            Operator::Divide => "÷",
        }
    }
}

/// A unary transform applied to the acting score before any binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraOperator {
    /// `score²`
    Square,
    /// `floor(√score)`
    SquareRoot,
}

impl ExtraOperator {
    /// Both extra operators.
    pub const ALL: [ExtraOperator; 2] = [ExtraOperator::Square, ExtraOperator::SquareRoot];
}

/// A skill card effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// The opponent's next turn is skipped.
    Freeze,
    /// Both scores are swapped.
    Mirror,
}

impl Skill {
    /// Both skills.
    pub const ALL: [Skill; 2] = [Skill::Freeze, Skill::Mirror];
}

/// The kind of a card, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardKind {
    /// A number card.
    Number,
    /// A binary operator card.
    Operator,
    /// A unary (square / square root) operator card.
    ExtraOperator,
    /// A skill card.
    Skill,
}

impl CardKind {
    /// All four kinds.
    pub const ALL: [CardKind; 4] = [
        CardKind::Number,
        CardKind::Operator,
        CardKind::ExtraOperator,
        CardKind::Skill,
    ];
}

/// One card.
///
/// Serialized adjacently tagged: `{"kind":"Number","value":7}`,
/// `{"kind":"Operator","value":"Add"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Card {
    /// A number card.
    Number(i64),
    /// A binary operator card.
    Operator(Operator),
    /// A unary operator card.
    ExtraOperator(ExtraOperator),
    /// A skill card.
    Skill(Skill),
}

impl Card {
    /// The kind of this card.
    pub fn kind(&self) -> CardKind {
        match self {
            Card::Number(_) => CardKind::Number,
            Card::Operator(_) => CardKind::Operator,
            Card::ExtraOperator(_) => CardKind::ExtraOperator,
            Card::Skill(_) => CardKind::Skill,
        }
    }

    /// The number value, if this is a Number card.
    pub fn number(&self) -> Option<i64> {
        match self {
            Card::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The skill, if this is a Skill card.
    pub fn skill(&self) -> Option<Skill> {
        match self {
            Card::Skill(s) => Some(*s),
            _ => None,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::Number(n) => write!(f, "{n}"),
            Card::Operator(op) => f.write_str(op.symbol()),
            Card::ExtraOperator(ExtraOperator::Square) => f.write_str("x²"),
            Card::ExtraOperator(ExtraOperator::SquareRoot) => f.write_str("√x"),
            Card::Skill(Skill::Freeze) => f.write_str("Freeze"),
            Card::Skill(Skill::Mirror) => f.write_str("Mirror"),
        }
    }
}

/// A session-wide transform applied to Number card values before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldModifier {
    /// No transform.
    #[default]
    Normal,
    /// Number values are squared.
    Square,
    /// Number values become `floor(√n)`.
    SquareRoot,
}

impl fmt::Display for FieldModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldModifier::Normal => f.write_str("normal field"),
            FieldModifier::Square => f.write_str("square field"),
            FieldModifier::SquareRoot => f.write_str("square-root field"),
        }
    }
}
