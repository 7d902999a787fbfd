//! Seat and ordering types for numduel.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::WireError;

/// One of the two seats at the table.
///
/// Seat 0 is always the host (the peer that owns the deck), seat 1 the client.
/// Serialized as a bare integer so it matches the `playerIndex` wire field.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PlayerIndex(u8);

impl PlayerIndex {
    /// The host seat.
    pub const HOST: PlayerIndex = PlayerIndex(0);
    /// The client seat.
    pub const CLIENT: PlayerIndex = PlayerIndex(1);
    /// Both seats, in turn order.
    pub const BOTH: [PlayerIndex; 2] = [Self::HOST, Self::CLIENT];

    /// Create a seat from a raw index, rejecting anything but 0 or 1.
    pub fn new(index: u8) -> Option<Self> {
        (index < 2).then_some(Self(index))
    }

    /// The raw 0-based index, usable for `[T; 2]` lookups.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The opposing seat.
    pub const fn other(self) -> Self {
        Self(1 - self.0)
    }

    /// Whether this is the host seat.
    pub const fn is_host(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u8> for PlayerIndex {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| WireError::InvalidData(format!("player index {value}")))
    }
}

impl From<PlayerIndex> for u8 {
    fn from(player: PlayerIndex) -> Self {
        player.0
    }
}

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.0 + 1)
    }
}

impl fmt::Debug for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerIndex({})", self.0)
    }
}

/// A per-sender, strictly increasing envelope sequence number.
///
/// The first envelope a peer sends carries `Seq(1)`; `Seq(0)` means
/// "nothing received yet" on the receiving side.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Seq(u64);

impl Seq {
    /// Create a new Seq with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this Seq.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Create a Seq representing "nothing seen yet".
    pub fn zero() -> Self {
        Self(0)
    }

    /// Increment the sequence by one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_index_bounds() {
        assert_eq!(PlayerIndex::new(0), Some(PlayerIndex::HOST));
        assert_eq!(PlayerIndex::new(1), Some(PlayerIndex::CLIENT));
        assert!(PlayerIndex::new(2).is_none());
    }

    #[test]
    fn player_index_other() {
        assert_eq!(PlayerIndex::HOST.other(), PlayerIndex::CLIENT);
        assert_eq!(PlayerIndex::CLIENT.other(), PlayerIndex::HOST);
        assert!(PlayerIndex::HOST.is_host());
        assert!(!PlayerIndex::CLIENT.is_host());
    }

    #[test]
    fn player_index_serializes_as_integer() {
        let json = serde_json::to_string(&PlayerIndex::CLIENT).unwrap();
        assert_eq!(json, "1");
        let restored: PlayerIndex = serde_json::from_str("0").unwrap();
        assert_eq!(restored, PlayerIndex::HOST);
    }

    #[test]
    fn player_index_rejects_out_of_range() {
        assert!(serde_json::from_str::<PlayerIndex>("2").is_err());
    }

    #[test]
    fn player_index_display_is_one_based() {
        assert_eq!(PlayerIndex::HOST.to_string(), "Player 1");
        assert_eq!(PlayerIndex::CLIENT.to_string(), "Player 2");
    }

    #[test]
    fn seq_ordering_and_next() {
        let s = Seq::zero();
        assert_eq!(s.next().value(), 1);
        assert!(Seq::new(3) > Seq::new(2));
    }

    #[test]
    fn seq_saturating_add() {
        let s = Seq::new(u64::MAX);
        assert_eq!(s.next().value(), u64::MAX);
    }
}
