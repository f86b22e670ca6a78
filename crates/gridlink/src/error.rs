//! Unified error type for the gridlink client.

use gridlink_protocol::ProtocolError;
use gridlink_sync::SyncError;
use gridlink_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// Only setup and upstream calls return it. Once connected, the realtime
/// path logs problems instead of surfacing them.
#[derive(Debug, thiserror::Error)]
pub enum GridlinkError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, decompress).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A synchronization error (mailbox, timeout).
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The endpoint could not be parsed or joined.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The endpoint does not use `wss://`.
    #[error("refusing insecure endpoint {0}, expected wss://")]
    InsecureUrl(String),

    /// The endpoint is `wss://` but this build has no TLS backend.
    #[error("endpoint {0} needs TLS; enable the `tls` feature")]
    TlsUnavailable(String),

    /// Neither a host nor an explicit URL was configured.
    #[error("no endpoint configured: set a host or a URL")]
    MissingEndpoint,

    /// The HTTP collaborator failed.
    #[error("upstream request failed: {0}")]
    Upstream(String),
}
