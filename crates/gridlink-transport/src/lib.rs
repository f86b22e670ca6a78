//! Transport layer for the gridlink client.
//!
//! Provides the [`Connection`] and [`Connector`] traits that abstract over
//! the duplex socket, and the [`ConnectionManager`] that keeps one such
//! connection alive:
//!
//! - reconnects with a pluggable [`Backoff`] (linear by default),
//! - buffers outbound frames in a bounded [`LruBuffer`] while disconnected,
//! - hands every inbound [`Frame`] to a single handler, in arrival order.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket connector via `tokio-tungstenite`
//! - `tls`: enables `wss://` endpoints (native TLS backend); see
//!   [`TLS_SUPPORTED`]

mod backoff;
mod buffer;
mod error;
mod manager;
mod state;
#[cfg(feature = "websocket")]
mod websocket;

pub use backoff::{Backoff, LinearBackoff};
pub use buffer::LruBuffer;
pub use error::TransportError;
pub use manager::{
    ConnectionManager, ConnectionManagerBuilder, FrameHandler, ReconnectConfig,
};
pub use state::{ConnectionState, ConnectionStateWatch};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

/// Whether this build can dial `wss://` endpoints.
///
/// Without the `tls` feature a secure URL fails on every connect attempt,
/// so callers should check this before handing one to a connector.
pub const TLS_SUPPORTED: bool = cfg!(feature = "tls");

/// Opaque identifier for a connection.
///
/// Every successful (re)connection gets a fresh id, which makes the
/// reconnect history readable in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One inbound message as it came off the socket.
///
/// The wire protocol is binary-only, but the socket can still deliver
/// text frames. They are surfaced as-is so the decoding layer can reject
/// them explicitly instead of silently reinterpreting the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A binary frame.
    Binary(Vec<u8>),
    /// A text frame.
    Text(String),
}

impl Frame {
    /// Returns the payload if this is a binary frame.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(data) => Some(data),
            Self::Text(_) => None,
        }
    }

    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(data) => data.len(),
            Self::Text(text) => text.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single open duplex connection.
///
/// `send` and `recv` may be called concurrently: the manager polls one
/// reader and one writer against the same connection. Either future may be
/// dropped mid-call when the other side ends the session.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends a binary frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Frame>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Opens connections to one fixed endpoint.
///
/// The [`ConnectionManager`] calls this once at start and again after
/// every closure.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;
    /// The error type for connect attempts.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Opens a new connection.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// Something outbound frames can be handed to without waiting.
///
/// Implemented by [`ConnectionManager`]; the sync layer depends on this
/// trait only, so it can be driven by an in-memory sink in tests.
pub trait FrameSink: Send + Sync + 'static {
    /// Queues a frame for sending. Never suspends and never fails: frames
    /// that cannot be sent right now are buffered or dropped with a log.
    fn send_frame(&self, data: Vec<u8>);
}
