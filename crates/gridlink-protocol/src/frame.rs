//! Turning envelopes into socket frames and back.

use gridlink_transport::Frame;

use crate::{Codec, Envelope, ProtocolError, WireCodec};

/// Encodes outbound envelopes and decodes inbound frames.
///
/// Decoding has two flavours. [`try_decode`](Self::try_decode) returns the
/// error for callers that want it; [`decode`](Self::decode) is what the
/// realtime path uses, and turns every failure into `None` plus exactly
/// one warning.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec<C = WireCodec> {
    codec: C,
}

impl<C: Codec> FrameCodec<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Serializes and compresses an envelope into a binary frame payload.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
        self.codec.encode(envelope)
    }

    /// Decodes a frame into an envelope.
    ///
    /// # Errors
    /// Returns `ProtocolError::NotBinary` for text frames, and a
    /// decompress/decode error for malformed payloads.
    pub fn try_decode(&self, frame: &Frame) -> Result<Envelope, ProtocolError> {
        let bytes = frame.as_binary().ok_or(ProtocolError::NotBinary)?;
        self.codec.decode(bytes)
    }

    /// Decodes a frame, logging and discarding anything unreadable.
    pub fn decode(&self, frame: &Frame) -> Option<Envelope> {
        match self.try_decode(frame) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::warn!(len = frame.len(), error = %e, "dropping undecodable frame");
                None
            }
        }
    }
}
