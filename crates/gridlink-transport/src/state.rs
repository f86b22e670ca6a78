//! Observable connection lifecycle state.

use std::fmt;

use tokio::sync::watch;

/// Connection lifecycle state.
///
/// ```text
///   Disconnected ──(attempt)──→ Connecting ──(open)──→ Connected
///        ↑                          │                      │
///        └──────(failure)───────────┘                      │
///        └──────────────────(closure / error)──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket; sends are buffered.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Socket open; sends go straight to the writer.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// [`ConnectionState`] backed by a [`watch`] channel, so any number of
/// consumers can react to transitions without polling.
#[derive(Debug)]
pub struct ConnectionStateWatch {
    tx: watch::Sender<ConnectionState>,
}

impl Default for ConnectionStateWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateWatch {
    /// Creates a watch initialized to [`ConnectionState::Disconnected`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    /// Sets the current state, notifying subscribers if it changed.
    pub fn set(&self, state: ConnectionState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                tracing::debug!(from = %current, to = %state, "connection state changed");
                *current = state;
                true
            }
        });
    }

    /// Returns a new subscriber.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Returns the current state without blocking.
    pub fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }
}
