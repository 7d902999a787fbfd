//! Envelope - the frame body wrapping every protocol message.

use serde::{Deserialize, Serialize};

use crate::{DeckCounts, Message, MessageType, PlayerIndex, Seq, WireError};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// The envelope wraps a [`Message`] with sequencing metadata.
///
/// The message fields are flattened into the envelope object, so a frame body
/// looks like `{"version":1,"seq":3,"sender":0,"type":"Turn",...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Protocol version (currently 1)
    pub version: u8,
    /// Per-sender sequence number, strictly increasing from 1
    pub seq: Seq,
    /// Seat of the sending peer
    pub sender: PlayerIndex,
    /// Authoritative deck counts, piggy-backed by the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_counts: Option<DeckCounts>,
    /// The wrapped message
    #[serde(flatten)]
    pub message: Message,
}

impl Envelope {
    /// Create a new envelope. The deck counts start empty.
    pub fn new(seq: Seq, sender: PlayerIndex, message: Message) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            seq,
            sender,
            deck_counts: None,
            message,
        }
    }

    /// Attach piggy-backed deck counts.
    pub fn with_counts(mut self, counts: DeckCounts) -> Self {
        self.deck_counts = Some(counts);
        self
    }

    /// The type of the wrapped message.
    pub fn message_type(&self) -> MessageType {
        self.message.message_type()
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(self).map_err(WireError::Serialization)
    }

    /// Deserialize from JSON bytes.
    ///
    /// The version and the `type` tag are checked before the full decode, so
    /// a newer peer's message surfaces as [`WireError::UnknownMessageType`]
    /// instead of a generic parse failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(WireError::Deserialization)?;

        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| WireError::InvalidData("missing version".into()))?;
        if version != u64::from(PROTOCOL_VERSION) {
            return Err(WireError::UnsupportedVersion(
                u8::try_from(version).unwrap_or(u8::MAX),
            ));
        }

        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| WireError::InvalidData("missing message type".into()))?;
        MessageType::from_name(tag)?;

        serde_json::from_value(value).map_err(WireError::Deserialization)
    }
}
