//! The exclusive move round trip.

use std::sync::Arc;
use std::time::Duration;

use gridlink_protocol::{
    Codec, Envelope, FieldOfView, FrameCodec, GridPos, MoveRequestData, ServerState, WireCodec,
};
use gridlink_transport::FrameSink;
use tracing::{debug, warn};

use crate::{Offer, ProtocolLock, ResponseMailbox, StateNotifier, SyncError};

/// Tuning for [`ExclusiveMoveSession`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// How long to wait for a move response before giving up.
    ///
    /// `None` (the default) waits forever, holding the protocol lock the
    /// whole time. With a timeout, a late response is discarded at the
    /// start of the next move.
    pub response_timeout: Option<Duration>,
}

impl SessionConfig {
    /// A zero timeout would fail every move, so it is treated as "none".
    pub fn validated(mut self) -> Self {
        if self.response_timeout == Some(Duration::ZERO) {
            self.response_timeout = None;
        }
        self
    }
}

/// How a [`move_to`](ExclusiveMoveSession::move_to) call ended.
///
/// Purely informational: every failure has already been logged.
#[derive(Debug)]
pub enum MoveOutcome {
    /// The server answered. `offer` says whether observers saw it.
    Responded { time: u64, offer: Offer },
    /// The request could not be encoded; nothing was sent.
    EncodeFailed,
    /// The request was sent but no response was obtained.
    NoResponse(SyncError),
}

impl MoveOutcome {
    pub fn is_responded(&self) -> bool {
        matches!(self, Self::Responded { .. })
    }
}

/// Runs move requests one at a time over a shared connection.
///
/// Each call takes the [`ProtocolLock`], sends a `move-request`, waits on
/// the [`ResponseMailbox`] for the matching `move-response`, releases the
/// lock, and only then offers the response to the [`StateNotifier`].
/// While the lock is held, pushed state updates are suppressed, so the
/// response is the next thing observers see.
///
/// One exception: when another `move_to` is already queued, the lock
/// passes straight to it as the guard drops. On a multi-threaded runtime
/// that caller can mark the lock held before this response is offered, and
/// the response is then suppressed like a pushed update
/// ([`Offer::Suppressed`]). The queued move's own response carries a newer
/// `time` and still reaches observers. On a current-thread runtime the
/// offer always runs first.
pub struct ExclusiveMoveSession<S, C = WireCodec> {
    sink: S,
    codec: FrameCodec<C>,
    lock: ProtocolLock,
    mailbox: Arc<ResponseMailbox<ServerState>>,
    notifier: Arc<StateNotifier>,
    config: SessionConfig,
}

impl<S: FrameSink> ExclusiveMoveSession<S, WireCodec> {
    /// Creates a session speaking the wire codec. The protocol lock is
    /// the one `notifier` was built with.
    pub fn new(
        sink: S,
        notifier: Arc<StateNotifier>,
        mailbox: Arc<ResponseMailbox<ServerState>>,
    ) -> Self {
        Self {
            sink,
            codec: FrameCodec::default(),
            lock: notifier.lock().clone(),
            mailbox,
            notifier,
            config: SessionConfig::default(),
        }
    }
}

impl<S: FrameSink, C: Codec> ExclusiveMoveSession<S, C> {
    /// Swaps the codec used for outbound requests.
    pub fn with_codec<C2: Codec>(self, codec: C2) -> ExclusiveMoveSession<S, C2> {
        ExclusiveMoveSession {
            sink: self.sink,
            codec: FrameCodec::new(codec),
            lock: self.lock,
            mailbox: self.mailbox,
            notifier: self.notifier,
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config.validated();
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns `true` while a move is in flight.
    pub fn is_busy(&self) -> bool {
        self.lock.is_locked()
    }

    /// Asks the server to move the local player to `(grid_x, grid_y)`.
    ///
    /// Concurrent calls queue on the protocol lock and run in arrival
    /// order. Never fails: problems are logged and reported in the
    /// returned [`MoveOutcome`], which callers may ignore.
    pub async fn move_to(&self, grid_x: u32, grid_y: u32, fov: FieldOfView) -> MoveOutcome {
        let target = GridPos::new(grid_x, grid_y);
        debug!(%target, ?fov, "move requested, waiting for protocol lock");

        let response = {
            let _guard = self.lock.acquire().await;
            debug!(%target, "protocol lock acquired, sending move request");

            if let Some(stale) = self.mailbox.take_stale() {
                debug!(time = stale.time, "discarding unclaimed move response");
            }

            let request = Envelope::MoveRequest(MoveRequestData {
                grid_x,
                grid_y,
                fov,
            });
            let bytes = match self.codec.encode(&request) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(%target, error = %e, "failed to encode move request");
                    return MoveOutcome::EncodeFailed;
                }
            };
            self.sink.send_frame(bytes);

            match self.await_response().await {
                Ok(state) => state,
                Err(e) => {
                    warn!(%target, error = %e, "unable to get move response");
                    return MoveOutcome::NoResponse(e);
                }
            }
        };

        let time = response.time;
        debug!(%target, time, "received move response");
        let offer = self.notifier.offer(response);
        MoveOutcome::Responded { time, offer }
    }

    async fn await_response(&self) -> Result<ServerState, SyncError> {
        match self.config.response_timeout {
            None => self.mailbox.await_value().await,
            Some(limit) => tokio::time::timeout(limit, self.mailbox.await_value())
                .await
                .map_err(|_| SyncError::ResponseTimeout(limit))?,
        }
    }
}
