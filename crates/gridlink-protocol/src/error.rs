//! Error types for the protocol layer.
//!
//! Each gridlink crate defines its own error enum. A `ProtocolError` always
//! means the bytes were wrong: bad JSON, a broken LZ4 block, or a frame
//! of the wrong kind. It never means the socket misbehaved.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed.
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, missing
    /// required fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The LZ4 block could not be decompressed.
    #[error("decompress failed: {0}")]
    Decompress(String),

    /// A text frame arrived where only binary frames are valid.
    #[error("expected a binary frame, got text")]
    NotBinary,
}
