//! Turn state machine.
//!
//! [`TurnState`] holds the replicated per-session counters: whose turn it is,
//! the round, both scores and both frozen flags. It performs no I/O and knows
//! nothing about hands or the deck; [`GameSession`](crate::GameSession) drives
//! it for both local and remote actions so both replicas step identically.

use numduel_types::{FieldModifier, FieldSchedule, GameOverReason, PlayerIndex};
use std::fmt;

use crate::RulesConfig;

/// Session lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for both peers to be ready.
    AwaitingSetup,
    /// `player` may act.
    AwaitingAction {
        /// The player whose turn it is.
        player: PlayerIndex,
    },
    /// Terminal: the game finished.
    GameOver(Outcome),
    /// Terminal: the session was abandoned.
    Aborted(AbortReason),
}

impl Phase {
    /// Whether no further actions are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::GameOver(_) | Phase::Aborted(_))
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The winner, `None` for a draw.
    pub winner: Option<PlayerIndex>,
    /// Final scores indexed by seat.
    pub scores: [i64; 2],
    /// Why the game ended.
    pub reason: GameOverReason,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.winner, self.reason) {
            (Some(winner), GameOverReason::TargetReached) => {
                write!(f, "{winner} wins by reaching the target")
            }
            (Some(winner), GameOverReason::RoundsExhausted) => {
                write!(f, "{winner} wins by finishing closest to the target")
            }
            (None, _) => f.write_str("draw"),
        }?;
        write!(f, " ({} : {})", self.scores[0], self.scores[1])
    }
}

/// Why a session was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// A request to the peer went unanswered past its deadline.
    PeerUnresponsive,
    /// The connection closed before the game ended.
    ConnectionLost,
    /// The peer sent something inconsistent with the game state.
    ProtocolViolation(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::PeerUnresponsive => f.write_str("peer unresponsive"),
            AbortReason::ConnectionLost => f.write_str("connection lost"),
            AbortReason::ProtocolViolation(reason) => write!(f, "protocol violation: {reason}"),
        }
    }
}

/// What a single player may currently do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Not this player's turn, or the game is not running.
    Waiting,
    /// May play, draw or pass.
    CanPlay,
    /// A draw request is in flight.
    AwaitingDraw,
    /// The turn will be skipped without input.
    Frozen,
}

/// A request sent to the peer that still awaits its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequest {
    /// `DrawCard` sent, waiting for `DrawCardResponse`.
    Draw,
    /// Waiting for `TargetNumber`.
    Target,
}

/// Result of passing the turn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The turn now belongs to `player`.
    Next {
        /// The new current player.
        player: PlayerIndex,
        /// Whether that player is frozen and must be skipped.
        frozen: bool,
    },
    /// The round limit was passed; the game is over.
    RoundsExhausted,
    /// The game is not running; nothing changed.
    Stopped,
}

/// Replicated turn counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    phase: Phase,
    round: u32,
    scores: [i64; 2],
    frozen: [bool; 2],
    has_drawn: bool,
    schedule: FieldSchedule,
    max_rounds: u32,
}

impl TurnState {
    /// A fresh state awaiting setup.
    pub fn new(rules: &RulesConfig) -> Self {
        Self {
            phase: Phase::AwaitingSetup,
            round: 1,
            scores: [rules.starting_score; 2],
            frozen: [false; 2],
            has_drawn: false,
            schedule: FieldSchedule::none(),
            max_rounds: rules.max_rounds,
        }
    }

    /// Leave setup: `first` acts, under `schedule`.
    pub fn start(&mut self, first: PlayerIndex, schedule: FieldSchedule) {
        self.phase = Phase::AwaitingAction { player: first };
        self.schedule = schedule;
        self.round = 1;
    }

    /// Current phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The player allowed to act, if the game is running.
    pub fn current(&self) -> Option<PlayerIndex> {
        match self.phase {
            Phase::AwaitingAction { player } => Some(player),
            _ => None,
        }
    }

    /// The 1-based round.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The field in force this round.
    pub fn field(&self) -> FieldModifier {
        self.schedule.field_for(self.round)
    }

    /// The field schedule.
    pub fn schedule(&self) -> FieldSchedule {
        self.schedule
    }

    /// Both scores.
    pub fn scores(&self) -> [i64; 2] {
        self.scores
    }

    /// One player's score.
    pub fn score(&self, player: PlayerIndex) -> i64 {
        self.scores[player.index()]
    }

    /// Set one player's score.
    pub fn set_score(&mut self, player: PlayerIndex, score: i64) {
        self.scores[player.index()] = score;
    }

    /// Overwrite both scores.
    pub fn set_scores(&mut self, scores: [i64; 2]) {
        self.scores = scores;
    }

    /// Swap both scores.
    pub fn swap_scores(&mut self) {
        self.scores.swap(0, 1);
    }

    /// Whether `player` is frozen.
    pub fn is_frozen(&self, player: PlayerIndex) -> bool {
        self.frozen[player.index()]
    }

    /// Set or clear `player`'s frozen flag.
    pub fn set_frozen(&mut self, player: PlayerIndex, frozen: bool) {
        self.frozen[player.index()] = frozen;
    }

    /// Whether the current player already drew this turn.
    pub fn has_drawn(&self) -> bool {
        self.has_drawn
    }

    /// Record the current player's draw.
    pub fn mark_drawn(&mut self) {
        self.has_drawn = true;
    }

    /// What `player` may do, given any in-flight request.
    pub fn gate(&self, player: PlayerIndex, pending: Option<PendingRequest>) -> Gate {
        if self.current() != Some(player) {
            return Gate::Waiting;
        }
        if self.is_frozen(player) {
            return Gate::Frozen;
        }
        match pending {
            Some(PendingRequest::Draw) => Gate::AwaitingDraw,
            _ => Gate::CanPlay,
        }
    }

    /// Pass the turn to the other player.
    ///
    /// The round counter moves on each time the turn returns to the host
    /// seat. Past the round limit the game ends with the closest score
    /// winning, using `target`.
    pub fn advance(&mut self, target: Option<i64>) -> Advance {
        let Some(player) = self.current() else {
            return Advance::Stopped;
        };
        let next = player.other();
        self.has_drawn = false;
        if next.is_host() {
            self.round = self.round.saturating_add(1);
        }

        if self.round > self.max_rounds {
            let outcome = closest_to(target.unwrap_or_default(), self.scores);
            self.finish(outcome);
            return Advance::RoundsExhausted;
        }

        self.phase = Phase::AwaitingAction { player: next };
        Advance::Next {
            player: next,
            frozen: self.is_frozen(next),
        }
    }

    /// Whether `player` reached `target`.
    pub fn reached(&self, player: PlayerIndex, target: Option<i64>) -> bool {
        target.is_some_and(|t| self.score(player) >= t)
    }

    /// Enter `GameOver`. Returns `false` if already terminal.
    pub fn finish(&mut self, outcome: Outcome) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = Phase::GameOver(outcome);
        true
    }

    /// Enter `Aborted`. Returns `false` if already terminal.
    pub fn abort(&mut self, reason: AbortReason) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = Phase::Aborted(reason);
        true
    }
}

/// Decide a game that ran out of rounds: smaller distance wins, equal draws.
pub fn closest_to(target: i64, scores: [i64; 2]) -> Outcome {
    let distance = |s: i64| (target as i128 - s as i128).unsigned_abs();
    let (d0, d1) = (distance(scores[0]), distance(scores[1]));
    let winner = match d0.cmp(&d1) {
        std::cmp::Ordering::Less => Some(PlayerIndex::HOST),
        std::cmp::Ordering::Greater => Some(PlayerIndex::CLIENT),
        std::cmp::Ordering::Equal => None,
    };
    Outcome {
        winner,
        scores,
        reason: GameOverReason::RoundsExhausted,
    }
}
