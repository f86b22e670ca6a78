//! Wire protocol for gridlink.
//!
//! This crate defines what travels over the socket:
//!
//! - **Types** ([`Envelope`], [`ServerState`], [`MoveRequestData`], ...):
//!   the server's JSON shapes, plus grid geometry ([`GridPos`],
//!   [`FieldOfView`]).
//! - **Codecs** ([`Codec`], [`JsonCodec`], [`CompressedCodec`]): how values
//!   become bytes. [`WireCodec`] is LZ4-compressed JSON.
//! - **Framing** ([`FrameCodec`]): envelopes to socket frames and back,
//!   with malformed input logged and dropped.
//!
//! ```text
//! Transport (Frame) → Protocol (Envelope) → Sync (notifier / mailbox)
//! ```

mod codec;
mod error;
#[cfg(feature = "json")]
mod frame;
mod types;

pub use codec::{Codec, CompressedCodec, MAX_DECOMPRESSED_LEN};
#[cfg(feature = "json")]
pub use codec::{JsonCodec, WireCodec};
pub use error::ProtocolError;
#[cfg(feature = "json")]
pub use frame::FrameCodec;
pub use types::{
    Envelope, FieldOfView, GameConfig, GridCellState, GridPos, MoveRequestData,
    PlayerId, PlayerState, PlayerStatus, ServerState, ServerStats,
};
