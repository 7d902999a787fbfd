//! Async length-prefixed framing over any byte stream.
//!
//! [`FrameReader`] never fails on bad input: zero-length and oversized frames
//! are skipped by their declared length and undecodable bodies are dropped,
//! each with a warning. Only EOF or an I/O error ends the stream.

use numduel_types::frame::{self, LENGTH_PREFIX_SIZE};
use numduel_types::{Envelope, WireError};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;

/// Reads envelopes from a byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a readable stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next decodable envelope.
    ///
    /// Returns `Ok(None)` on EOF, including EOF in the middle of a frame.
    pub async fn next_envelope(&mut self) -> io::Result<Option<Envelope>> {
        loop {
            let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
            if !read_full(&mut self.inner, &mut prefix).await? {
                return Ok(None);
            }

            let len = match frame::check_length(u32::from_be_bytes(prefix)) {
                Ok(len) => len,
                Err(WireError::FrameTooLarge { len, max }) => {
                    tracing::warn!(len, max, "skipping oversized frame");
                    let mut body = (&mut self.inner).take(len as u64);
                    let skipped = tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
                    if skipped < len as u64 {
                        return Ok(None);
                    }
                    continue;
                }
                Err(e) => {
                    tracing::warn!("skipping frame: {}", e);
                    continue;
                }
            };

            let mut body = vec![0u8; len];
            if !read_full(&mut self.inner, &mut body).await? {
                return Ok(None);
            }

            match Envelope::from_bytes(&body) {
                Ok(envelope) => {
                    tracing::debug!(
                        seq = %envelope.seq,
                        message_type = %envelope.message_type(),
                        len,
                        "received frame"
                    );
                    return Ok(Some(envelope));
                }
                Err(e) => tracing::warn!(len, "dropping frame: {}", e),
            }
        }
    }
}

/// `read_exact` that maps EOF to `Ok(false)`.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Writes envelopes to a byte stream.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap a writable stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Encode, frame and flush one envelope.
    pub async fn send(&mut self, envelope: &Envelope) -> Result<()> {
        let frame = frame::encode_envelope(envelope)?;
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        tracing::debug!(
            seq = %envelope.seq,
            message_type = %envelope.message_type(),
            len = frame.len() - LENGTH_PREFIX_SIZE,
            "sent frame"
        );
        Ok(())
    }

    /// Close the write half.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}
