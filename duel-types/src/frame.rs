//! Length-prefix framing.
//!
//! A frame is a 4-byte big-endian `u32` body length followed by that many
//! bytes of UTF-8 JSON. The async reader and writer live in `numduel-peer`;
//! this module holds the constants and the byte-level checks both sides share.

use crate::{Envelope, WireError};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest accepted frame body.
pub const MAX_FRAME_SIZE: usize = 4096;

/// Validate a declared body length.
pub fn check_length(len: u32) -> Result<usize, WireError> {
    let len = len as usize;
    if len == 0 {
        return Err(WireError::EmptyFrame);
    }
    if len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(len)
}

/// Prefix a body with its length.
pub fn encode_frame(body: &[u8]) -> Result<Vec<u8>, WireError> {
    let len = u32::try_from(body.len()).map_err(|_| WireError::FrameTooLarge {
        len: body.len(),
        max: MAX_FRAME_SIZE,
    })?;
    check_length(len)?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Serialize an envelope and frame it.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, WireError> {
    encode_frame(&envelope.to_bytes()?)
}
