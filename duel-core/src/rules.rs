//! Tunable game rules.
//!
//! Loaded from the `[rules]` section of the peer configuration. Both peers
//! must agree on these; only the host's values influence randomness.

use serde::Deserialize;

/// Game rule parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RulesConfig {
    /// Number cards in an initial hand (default: 3).
    #[serde(default = "default_hand_numbers")]
    pub hand_numbers: usize,
    /// Operator cards in an initial hand (default: 2).
    #[serde(default = "default_hand_operators")]
    pub hand_operators: usize,
    /// Skill or extra operator cards in an initial hand (default: 1).
    #[serde(default = "default_hand_specials")]
    pub hand_specials: usize,
    /// Cards taken by one draw action (default: 2).
    #[serde(default = "default_draw_count")]
    pub draw_count: u32,
    /// Rounds played before the closest score wins (default: 10).
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Round on which the special field applies (default: 5, 0 disables).
    #[serde(default = "default_field_round")]
    pub field_round: u32,
    /// Lowest possible target number (default: 1).
    #[serde(default = "default_target_min")]
    pub target_min: i64,
    /// Highest possible target number (default: 99).
    #[serde(default = "default_target_max")]
    pub target_max: i64,
    /// Score every player starts with (default: 1).
    #[serde(default = "default_starting_score")]
    pub starting_score: i64,
    /// Recompute remote plays and abort on a mismatching result (default: true).
    #[serde(default = "default_verify_remote_results")]
    pub verify_remote_results: bool,
}

fn default_hand_numbers() -> usize {
    3
}

fn default_hand_operators() -> usize {
    2
}

fn default_hand_specials() -> usize {
    1
}

fn default_draw_count() -> u32 {
    2
}

fn default_max_rounds() -> u32 {
    10
}

fn default_field_round() -> u32 {
    5
}

fn default_target_min() -> i64 {
    1
}

fn default_target_max() -> i64 {
    99
}

fn default_starting_score() -> i64 {
    1
}

fn default_verify_remote_results() -> bool {
    true
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            hand_numbers: default_hand_numbers(),
            hand_operators: default_hand_operators(),
            hand_specials: default_hand_specials(),
            draw_count: default_draw_count(),
            max_rounds: default_max_rounds(),
            field_round: default_field_round(),
            target_min: default_target_min(),
            target_max: default_target_max(),
            starting_score: default_starting_score(),
            verify_remote_results: default_verify_remote_results(),
        }
    }
}

impl RulesConfig {
    /// Size of one initial hand.
    pub fn hand_size(&self) -> usize {
        self.hand_numbers + self.hand_operators + self.hand_specials
    }

    /// The target range, with the bounds put in order.
    pub fn target_range(&self) -> std::ops::RangeInclusive<i64> {
        let lo = self.target_min.min(self.target_max);
        let hi = self.target_min.max(self.target_max);
        lo..=hi
    }
}
