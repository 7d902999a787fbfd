//! The card deck.
//!
//! The host owns the only authoritative [`Deck`]. The client keeps a
//! [`DeckMirror`] holding the per-kind counts the host piggy-backs on its
//! envelopes, for display only.

use std::collections::VecDeque;

use numduel_types::{Card, CardKind, DeckCounts, ExtraOperator, Operator, Skill};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::RulesConfig;

/// Upper bound on the cards a [`DeckConfig`] may describe.
pub const MAX_DECK_SIZE: usize = 1024;

/// Deck composition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeckConfig {
    /// Lowest Number card value (default: 1).
    #[serde(default = "default_number_min")]
    pub number_min: i64,
    /// Highest Number card value (default: 12).
    #[serde(default = "default_number_max")]
    pub number_max: i64,
    /// Copies of each Number value (default: 3).
    #[serde(default = "default_number_copies")]
    pub number_copies: u32,
    /// Add cards (default: 8).
    #[serde(default = "default_add")]
    pub add: u32,
    /// Subtract cards (default: 6).
    #[serde(default = "default_subtract")]
    pub subtract: u32,
    /// Multiply cards (default: 8).
    #[serde(default = "default_multiply")]
    pub multiply: u32,
    /// Divide cards (default: 4).
    #[serde(default = "default_divide")]
    pub divide: u32,
    /// Freeze cards (default: 3).
    #[serde(default = "default_skill_copies")]
    pub freeze: u32,
    /// Mirror cards (default: 3).
    #[serde(default = "default_skill_copies")]
    pub mirror: u32,
    /// Square cards (default: 3).
    #[serde(default = "default_extra_copies")]
    pub square: u32,
    /// Square root cards (default: 3).
    #[serde(default = "default_extra_copies")]
    pub square_root: u32,
}

fn default_number_min() -> i64 {
    1
}

fn default_number_max() -> i64 {
    12
}

fn default_number_copies() -> u32 {
    3
}

fn default_add() -> u32 {
    8
}

fn default_subtract() -> u32 {
    6
}

fn default_multiply() -> u32 {
    8
}

fn default_divide() -> u32 {
    4
}

fn default_skill_copies() -> u32 {
    3
}

fn default_extra_copies() -> u32 {
    3
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            number_min: default_number_min(),
            number_max: default_number_max(),
            number_copies: default_number_copies(),
            add: default_add(),
            subtract: default_subtract(),
            multiply: default_multiply(),
            divide: default_divide(),
            freeze: default_skill_copies(),
            mirror: default_skill_copies(),
            square: default_extra_copies(),
            square_root: default_extra_copies(),
        }
    }
}

impl DeckConfig {
    /// Every configured card, unshuffled.
    pub fn cards(&self) -> Vec<Card> {
        let mut cards = Vec::with_capacity(self.total().min(MAX_DECK_SIZE));
        for value in self.number_min..=self.number_max {
            push_copies(&mut cards, Card::Number(value), self.number_copies);
        }

        let operators = [self.add, self.subtract, self.multiply, self.divide];
        for (op, copies) in Operator::ALL.into_iter().zip(operators) {
            push_copies(&mut cards, Card::Operator(op), copies);
        }

        let skills = [self.freeze, self.mirror];
        for (skill, copies) in Skill::ALL.into_iter().zip(skills) {
            push_copies(&mut cards, Card::Skill(skill), copies);
        }

        let extras = [self.square, self.square_root];
        for (extra, copies) in ExtraOperator::ALL.into_iter().zip(extras) {
            push_copies(&mut cards, Card::ExtraOperator(extra), copies);
        }
        cards
    }

    /// Total number of cards in the composition. Saturates instead of
    /// overflowing for extreme bounds.
    pub fn total(&self) -> usize {
        let values = (i128::from(self.number_max) - i128::from(self.number_min) + 1).max(0);
        let numbers = u128::try_from(values)
            .unwrap_or(0)
            .saturating_mul(u128::from(self.number_copies));
        let per_kind = [
            self.add,
            self.subtract,
            self.multiply,
            self.divide,
            self.freeze,
            self.mirror,
            self.square,
            self.square_root,
        ]
        .iter()
        .map(|n| u128::from(*n))
        .sum::<u128>();
        usize::try_from(numbers.saturating_add(per_kind)).unwrap_or(usize::MAX)
    }

    /// Check the composition can be dealt.
    ///
    /// # Errors
    ///
    /// Describes the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.number_min > self.number_max {
            return Err(format!(
                "number_min {} is above number_max {}",
                self.number_min, self.number_max
            ));
        }
        let total = self.total();
        if total > MAX_DECK_SIZE {
            return Err(format!(
                "deck would hold {total} cards, at most {MAX_DECK_SIZE} are allowed"
            ));
        }
        Ok(())
    }
}

fn push_copies(cards: &mut Vec<Card>, card: Card, copies: u32) {
    cards.extend(std::iter::repeat(card).take(copies as usize));
}

/// The authoritative draw and discard piles.
#[derive(Debug)]
pub struct Deck {
    config: DeckConfig,
    draw_pile: VecDeque<Card>,
    discard_pile: Vec<Card>,
    rng: StdRng,
}

impl Deck {
    /// Build and shuffle a deck.
    pub fn new(config: DeckConfig, rng: StdRng) -> Self {
        let mut deck = Self {
            config,
            draw_pile: VecDeque::new(),
            discard_pile: Vec::new(),
            rng,
        };
        deck.initialize();
        deck
    }

    /// Reset both piles to the configured composition and shuffle.
    pub fn initialize(&mut self) {
        self.discard_pile.clear();
        self.draw_pile = self.config.cards().into();
        self.shuffle();
    }

    fn shuffle(&mut self) {
        self.draw_pile.make_contiguous().shuffle(&mut self.rng);
    }

    /// Take the front card.
    ///
    /// An empty draw pile is refilled from the shuffled discard pile first.
    /// Returns `None` only when both piles are empty.
    pub fn draw(&mut self) -> Option<Card> {
        if self.draw_pile.is_empty() {
            if self.discard_pile.is_empty() {
                return None;
            }
            self.draw_pile.extend(self.discard_pile.drain(..));
            self.shuffle();
            tracing::debug!(cards = self.draw_pile.len(), "reshuffled discard pile");
        }
        self.draw_pile.pop_front()
    }

    /// Draw up to `count` cards; fewer when the deck runs dry.
    pub fn draw_many(&mut self, count: u32) -> Vec<Card> {
        (0..count).map_while(|_| self.draw()).collect()
    }

    /// Draw the first card matching `pred`.
    ///
    /// Non-matching cards go to the bottom of the draw pile. At most one full
    /// pass is made, so this returns `None` when no card matches.
    pub fn draw_matching(&mut self, pred: impl Fn(&Card) -> bool) -> Option<Card> {
        let first = self.draw()?;
        if pred(&first) {
            return Some(first);
        }
        self.draw_pile.push_back(first);

        for _ in 1..self.draw_pile.len() {
            let card = self.draw_pile.pop_front()?;
            if pred(&card) {
                return Some(card);
            }
            self.draw_pile.push_back(card);
        }
        None
    }

    /// Deal an initial hand: numbers, then operators, then one special
    /// (skill or extra operator) card each, as sized by `rules`.
    pub fn deal_initial_hand(&mut self, rules: &RulesConfig) -> Vec<Card> {
        let mut hand = Vec::with_capacity(rules.hand_size());
        let shape: [(usize, fn(&Card) -> bool); 3] = [
            (rules.hand_numbers, |c| c.kind() == CardKind::Number),
            (rules.hand_operators, |c| c.kind() == CardKind::Operator),
            (rules.hand_specials, |c| {
                matches!(c.kind(), CardKind::Skill | CardKind::ExtraOperator)
            }),
        ];
        for (count, pred) in shape {
            for _ in 0..count {
                if let Some(card) = self.draw_matching(pred) {
                    hand.push(card);
                }
            }
        }
        hand
    }

    /// Put a card on the discard pile.
    pub fn discard(&mut self, card: Card) {
        self.discard_pile.push(card);
    }

    /// Put several cards on the discard pile.
    pub fn discard_all(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.discard_pile.extend(cards);
    }

    /// Cards of `kind` left in the draw pile. Hands and discards are not counted.
    pub fn count_by_kind(&self, kind: CardKind) -> u32 {
        self.draw_pile.iter().filter(|c| c.kind() == kind).count() as u32
    }

    /// Per-kind counts of the draw pile.
    pub fn counts(&self) -> DeckCounts {
        DeckCounts {
            number_card_count: self.count_by_kind(CardKind::Number),
            operator_card_count: self.count_by_kind(CardKind::Operator),
            extra_operator_card_count: self.count_by_kind(CardKind::ExtraOperator),
            skill_card_count: self.count_by_kind(CardKind::Skill),
        }
    }

    /// Cards in the draw pile.
    pub fn len(&self) -> usize {
        self.draw_pile.len()
    }

    /// Whether the draw pile is empty.
    pub fn is_empty(&self) -> bool {
        self.draw_pile.is_empty()
    }

    /// Cards in the discard pile.
    pub fn discard_len(&self) -> usize {
        self.discard_pile.len()
    }

    /// Total cards in the configured composition.
    pub fn total(&self) -> usize {
        self.config.total()
    }
}

/// Client-side, display-only copy of the host's deck counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckMirror {
    counts: DeckCounts,
}

impl DeckMirror {
    /// Replace the mirrored counts.
    pub fn update(&mut self, counts: DeckCounts) {
        self.counts = counts;
    }

    /// The last counts received.
    pub fn counts(&self) -> DeckCounts {
        self.counts
    }

    /// Total cards the host reported left.
    pub fn len(&self) -> usize {
        self.counts.total() as usize
    }

    /// Whether the host reported an empty draw pile.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
