//! The connection manager: one long-lived, self-healing duplex connection.
//!
//! A background driver task owns the socket. It runs this loop until
//! [`ConnectionManager::close`] is called:
//!
//! ```text
//!   connect ──ok──→ flush buffer ──→ read/write ──(closure)───┐
//!      ↑                                                      │
//!      └──────── sleep(backoff.next_delay()) ←────────────────┘
//! ```
//!
//! Callers never see any of this. [`send`](ConnectionManager::send)
//! either hands the frame to the live writer or parks it in the
//! [`LruBuffer`], and inbound frames reach the registered handler one at a
//! time, in arrival order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{
    Backoff, Connection, ConnectionState, ConnectionStateWatch, Connector,
    Frame, FrameSink, LinearBackoff, LruBuffer,
};

/// Callback invoked once per inbound frame.
pub type FrameHandler = Arc<dyn Fn(Frame) + Send + Sync>;

// ---------------------------------------------------------------------------
// ReconnectConfig
// ---------------------------------------------------------------------------

/// Reconnection and buffering settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first retry. Default: 0 ms.
    pub initial_delay: Duration,
    /// Added to the delay after each retry. Default: 1000 ms.
    pub delay_step: Duration,
    /// Upper bound on the delay. Default: 5000 ms.
    pub max_delay: Duration,
    /// Frames kept while disconnected; the oldest is evicted first.
    /// Default: 5.
    pub buffer_capacity: usize,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            delay_step: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            buffer_capacity: 5,
        }
    }
}

impl ReconnectConfig {
    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// - `buffer_capacity` is at least 1.
    /// - `max_delay` is at least `initial_delay`.
    pub fn validated(mut self) -> Self {
        if self.buffer_capacity == 0 {
            tracing::warn!("buffer_capacity of 0 would drop every offline send, using 1");
            self.buffer_capacity = 1;
        }
        if self.max_delay < self.initial_delay {
            self.max_delay = self.initial_delay;
        }
        self
    }

    /// The linear backoff described by this config.
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.initial_delay, self.delay_step, self.max_delay)
    }
}

// ---------------------------------------------------------------------------
// Shared outbound state
// ---------------------------------------------------------------------------

/// Everything `send` needs, guarded by one lock so that flushing the
/// buffer on reconnect and new sends can never interleave.
struct Outbound {
    /// Channel into the live connection's writer.
    writer: Option<mpsc::UnboundedSender<Vec<u8>>>,
    buffer: LruBuffer<Vec<u8>>,
    closed: bool,
}

struct Shared {
    outbound: Mutex<Outbound>,
    state: ConnectionStateWatch,
    dropped: AtomicU64,
}

impl Shared {
    fn outbound(&self) -> MutexGuard<'_, Outbound> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, data: Vec<u8>) {
        let mut out = self.outbound();
        if out.closed {
            tracing::warn!(bytes = data.len(), "send after close, dropping frame");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let data = match &out.writer {
            Some(writer) => match writer.send(data) {
                Ok(()) => return,
                // Driver is gone; keep the frame for the next connection.
                Err(mpsc::error::SendError(data)) => data,
            },
            None => data,
        };
        out.writer = None;

        if out.buffer.push(data).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                capacity = out.buffer.capacity(),
                "outbound buffer full, evicted oldest frame"
            );
        } else {
            tracing::debug!(buffered = out.buffer.len(), "disconnected, frame buffered");
        }
    }

    /// Installs a fresh writer, flushing buffered frames into it first.
    fn attach(&self, writer: mpsc::UnboundedSender<Vec<u8>>) {
        let mut out = self.outbound();
        let pending = out.buffer.drain();
        if !pending.is_empty() {
            tracing::debug!(frames = pending.len(), "flushing buffered frames");
        }
        for frame in pending {
            if writer.send(frame).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        out.writer = Some(writer);
        self.state.set(ConnectionState::Connected);
    }

    /// Drops the writer and puts every frame that never reached the socket
    /// back in front of the buffer, ahead of anything sent since.
    fn detach(&self, failed: Option<Vec<u8>>, rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) {
        let mut out = self.outbound();
        out.writer = None;
        let mut unsent: Vec<Vec<u8>> = failed.into_iter().collect();
        while let Ok(frame) = rx.try_recv() {
            unsent.push(frame);
        }

        if !unsent.is_empty() {
            if out.closed {
                self.dropped.fetch_add(unsent.len() as u64, Ordering::Relaxed);
                tracing::debug!(frames = unsent.len(), "discarding unsent frames on close");
            } else {
                let requeued = unsent.len();
                let later = out.buffer.drain();
                let mut evicted = 0u64;
                for frame in unsent.into_iter().chain(later) {
                    if out.buffer.push(frame).is_some() {
                        evicted += 1;
                    }
                }
                self.dropped.fetch_add(evicted, Ordering::Relaxed);
                tracing::warn!(frames = requeued, evicted, "connection lost with unsent frames, re-buffered");
            }
        }
        drop(out);
        self.state.set(ConnectionState::Disconnected);
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

struct Inner {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(driver) = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            driver.abort();
        }
    }
}

/// Handle to a managed, auto-reconnecting connection.
///
/// Cheap to clone. The driver task stops when [`close`](Self::close) is
/// called or the last handle is dropped.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Starts configuring a manager for the given connector.
    pub fn builder<C: Connector>(connector: C) -> ConnectionManagerBuilder<C> {
        ConnectionManagerBuilder::new(connector)
    }

    /// Queues a frame for sending.
    ///
    /// Never suspends. While disconnected the frame is buffered (up to the
    /// configured capacity, oldest evicted first) and flushed in order on
    /// reconnect.
    pub fn send(&self, data: Vec<u8>) {
        self.inner.shared.send(data);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.state.current()
    }

    /// Subscribes to lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.shared.state.subscribe()
    }

    /// Number of frames currently waiting for a connection.
    pub fn buffered(&self) -> usize {
        self.inner.shared.outbound().buffer.len()
    }

    /// Total frames dropped so far (buffer eviction or send after close).
    pub fn dropped(&self) -> u64 {
        self.inner.shared.dropped.load(Ordering::Relaxed)
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Idempotent. Frames sent afterwards are dropped.
    pub fn close(&self) {
        let mut out = self.inner.shared.outbound();
        if out.closed {
            return;
        }
        out.closed = true;
        out.writer = None;
        let discarded = out.buffer.drain().len();
        drop(out);

        if discarded > 0 {
            tracing::debug!(frames = discarded, "discarding buffered frames on close");
        }
        let _ = self.inner.shutdown_tx.send(true);
        tracing::info!("connection manager closed");
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.shared.outbound().closed
    }
}

impl FrameSink for ConnectionManager {
    fn send_frame(&self, data: Vec<u8>) {
        self.send(data);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`ConnectionManager`].
///
/// ```rust,ignore
/// let manager = ConnectionManager::builder(WebSocketConnector::new(url))
///     .reconnect_config(ReconnectConfig::default())
///     .on_frame(move |frame| {
///         dispatcher.handle_frame(frame);
///     })
///     .connect();
/// ```
pub struct ConnectionManagerBuilder<C, B = LinearBackoff> {
    connector: C,
    backoff: B,
    buffer_capacity: usize,
    handler: Option<FrameHandler>,
}

impl<C: Connector> ConnectionManagerBuilder<C> {
    /// Creates a builder with the default [`ReconnectConfig`].
    pub fn new(connector: C) -> Self {
        let config = ReconnectConfig::default();
        Self {
            connector,
            backoff: config.backoff(),
            buffer_capacity: config.buffer_capacity,
            handler: None,
        }
    }

    /// Applies delays and buffer size from a [`ReconnectConfig`].
    pub fn reconnect_config(mut self, config: ReconnectConfig) -> Self {
        let config = config.validated();
        self.backoff = config.backoff();
        self.buffer_capacity = config.buffer_capacity;
        self
    }
}

impl<C: Connector, B: Backoff> ConnectionManagerBuilder<C, B> {
    /// Replaces the delay policy.
    pub fn backoff<B2: Backoff>(self, backoff: B2) -> ConnectionManagerBuilder<C, B2> {
        ConnectionManagerBuilder {
            connector: self.connector,
            backoff,
            buffer_capacity: self.buffer_capacity,
            handler: self.handler,
        }
    }

    /// Sets the offline buffer capacity.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Registers the inbound frame handler.
    ///
    /// Called from the driver task, once per frame, in arrival order. A
    /// slow handler delays the next frame, so keep it non-blocking.
    pub fn on_frame<F>(mut self, handler: F) -> Self
    where
        F: Fn(Frame) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Spawns the driver task and returns the handle.
    ///
    /// Must be called from within a Tokio runtime. The first connect
    /// attempt starts immediately; sends made before it completes are
    /// buffered.
    pub fn connect(self) -> ConnectionManager {
        let shared = Arc::new(Shared {
            outbound: Mutex::new(Outbound {
                writer: None,
                buffer: LruBuffer::new(self.buffer_capacity),
                closed: false,
            }),
            state: ConnectionStateWatch::new(),
            dropped: AtomicU64::new(0),
        });
        let handler: FrameHandler = self.handler.unwrap_or_else(|| {
            Arc::new(|frame: Frame| {
                tracing::debug!(bytes = frame.len(), "no frame handler registered, dropping frame");
            })
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = tokio::spawn(drive(
            self.connector,
            self.backoff,
            Arc::clone(&shared),
            handler,
            shutdown_rx,
        ));

        ConnectionManager {
            inner: Arc::new(Inner {
                shared,
                shutdown_tx,
                driver: Mutex::new(Some(driver)),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// How a connected session ended.
enum SessionEnd {
    /// The client asked to stop.
    Shutdown,
    /// The peer closed or the socket failed; reconnect.
    Lost,
}

async fn drive<C, B>(
    connector: C,
    mut backoff: B,
    shared: Arc<Shared>,
    handler: FrameHandler,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    C: Connector,
    B: Backoff,
{
    let mut delay: Option<Duration> = None;
    let mut attempt: u64 = 0;

    loop {
        if let Some(delay) = delay.take() {
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "waiting before reconnect"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => break,
            }
        }
        if *shutdown_rx.borrow() {
            break;
        }

        attempt += 1;
        shared.state.set(ConnectionState::Connecting);

        let result = tokio::select! {
            result = connector.connect() => result,
            _ = shutdown_rx.changed() => break,
        };

        let conn = match result {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(attempt, error = %e, "connect attempt failed");
                shared.state.set(ConnectionState::Disconnected);
                delay = Some(backoff.next_delay());
                continue;
            }
        };

        let conn_id = conn.id();
        tracing::info!(%conn_id, attempt, "connected");
        backoff.reset();
        attempt = 0;

        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel();
        shared.attach(writer_tx);

        // Reads and writes share this task. Whichever side fails first ends
        // the session; the frame in flight at that moment is the only one
        // that can be lost.
        let (end, failed) = tokio::select! {
            end = read_loop(&conn, &handler, &mut shutdown_rx) => (end, None),
            failed = write_loop(&conn, &mut writer_rx) => (SessionEnd::Lost, Some(failed)),
        };

        shared.detach(failed, &mut writer_rx);

        match end {
            SessionEnd::Shutdown => {
                if let Err(e) = conn.close().await {
                    tracing::debug!(%conn_id, error = %e, "close failed");
                }
                break;
            }
            SessionEnd::Lost => {
                delay = Some(backoff.next_delay());
            }
        }
    }

    shared.state.set(ConnectionState::Disconnected);
    tracing::debug!("connection driver stopped");
}

async fn read_loop<T: Connection>(
    conn: &T,
    handler: &FrameHandler,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let conn_id = conn.id();
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => return SessionEnd::Shutdown,
            result = conn.recv() => match result {
                Ok(Some(frame)) => handler(frame),
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed by peer");
                    return SessionEnd::Lost;
                }
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "connection lost");
                    return SessionEnd::Lost;
                }
            },
        }
    }
}

/// Forwards queued frames to the socket.
///
/// Returns the frame that failed to send. Once the sender is dropped by
/// [`ConnectionManager::close`] it parks, leaving shutdown to the reader.
async fn write_loop<T: Connection>(
    conn: &T,
    rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
) -> Vec<u8> {
    while let Some(data) = rx.recv().await {
        if let Err(e) = conn.send(&data).await {
            tracing::warn!(conn_id = %conn.id(), error = %e, "send failed");
            return data;
        }
    }
    std::future::pending().await
}
