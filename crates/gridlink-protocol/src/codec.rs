//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The protocol layer doesn't care how messages are serialized; it just
//! needs something that implements [`Codec`]. Implementations stack:
//! [`CompressedCodec`] wraps any inner codec and LZ4-compresses its output,
//! and [`WireCodec`] is the combination the game server speaks.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Upper bound on the declared size of a decompressed frame.
pub const MAX_DECOMPRESSED_LEN: usize = 16 * 1024 * 1024;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because codecs live inside long-lived shared
/// client state that Tokio may touch from any worker thread.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` (or `Decompress`) if the bytes are
    /// malformed, truncated, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// CompressedCodec
// ---------------------------------------------------------------------------

/// Wraps another codec with LZ4 block compression.
///
/// Layout: 4-byte little-endian uncompressed length, then the LZ4 block
/// (`lz4_flex`'s size-prepended format).
///
/// ```rust
/// use gridlink_protocol::{Codec, CompressedCodec, JsonCodec};
///
/// let codec = CompressedCodec::new(JsonCodec);
/// let bytes = codec.encode(&vec![7u32; 64]).unwrap();
/// let back: Vec<u32> = codec.decode(&bytes).unwrap();
/// assert_eq!(back, vec![7u32; 64]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressedCodec<C> {
    inner: C,
}

impl<C: Codec> CompressedCodec<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The wrapped codec.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Codec> Codec for CompressedCodec<C> {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        let raw = self.inner.encode(value)?;
        Ok(lz4_flex::compress_prepend_size(&raw))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        let declared = data
            .get(..4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            .ok_or_else(|| ProtocolError::Decompress("missing size prefix".into()))?;
        if declared > MAX_DECOMPRESSED_LEN {
            return Err(ProtocolError::Decompress(format!(
                "declared size {declared} exceeds {MAX_DECOMPRESSED_LEN}"
            )));
        }
        let raw = lz4_flex::decompress_size_prepended(data)
            .map_err(|e| ProtocolError::Decompress(e.to_string()))?;
        self.inner.decode(&raw)
    }
}

/// The codec spoken on the wire: LZ4-compressed JSON.
#[cfg(feature = "json")]
pub type WireCodec = CompressedCodec<JsonCodec>;
