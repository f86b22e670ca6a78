//! `GridClient` builder and handle.
//!
//! This is the entry point for talking to a game server. It ties the
//! layers together for one connection:
//!
//! ```text
//! ConnectionManager → Dispatcher → StateNotifier / ResponseMailbox
//!                                   ↑
//!                     ExclusiveMoveSession ← MoveGovernor
//! ```

use std::sync::Arc;

use gridlink_protocol::{FieldOfView, GameConfig, ServerState};
use gridlink_sync::{
    Dispatcher, ExclusiveMoveSession, MoveOutcome, NotifierStats, ProtocolLock, ResponseMailbox,
    SessionConfig, StateNotifier, SubscriptionId,
};
use gridlink_transport::{
    Backoff, ConnectionManager, ConnectionState, Connector, LinearBackoff, ReconnectConfig,
};
use tokio::sync::watch;
use url::Url;

use crate::{
    ClientConfig, GovernorConfig, GridlinkError, LocalWorld, MoveGovernor, NoUpstream, Upstream,
};

/// Builder for a [`GridClient`].
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), gridlink::GridlinkError> {
/// use gridlink::GridClient;
///
/// let client = GridClient::builder().host("grid.example.com").connect()?;
/// client.on_new_state(|state| println!("t={} me at ({}, {})", state.time, state.me.grid_x, state.me.grid_y));
/// # Ok(())
/// # }
/// ```
pub struct GridClientBuilder<U = NoUpstream, B = LinearBackoff> {
    config: ClientConfig,
    upstream: U,
    backoff: Option<B>,
}

impl GridClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            upstream: NoUpstream,
            backoff: None,
        }
    }
}

impl Default for GridClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Upstream, B: Backoff> GridClientBuilder<U, B> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the game host. The endpoint becomes `wss://<host><path>`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    /// Sets the endpoint path. Default: `/websocket`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Sets the full endpoint URL, overriding host and path.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Accepts `ws://` endpoints. Local development only.
    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.config.allow_insecure = allow;
        self
    }

    pub fn reconnect_config(mut self, reconnect: ReconnectConfig) -> Self {
        self.config.reconnect = reconnect;
        self
    }

    /// Sets the offline send buffer size. Default: 5.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.reconnect.buffer_capacity = capacity;
        self
    }

    pub fn session_config(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Gives up on a move response after `timeout`. Default: wait forever.
    pub fn response_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.session.response_timeout = Some(timeout);
        self
    }

    pub fn governor_config(mut self, governor: GovernorConfig) -> Self {
        self.config.governor = governor;
        self
    }

    /// Plugs in the HTTP collaborator.
    pub fn upstream<U2: Upstream>(self, upstream: U2) -> GridClientBuilder<U2, B> {
        GridClientBuilder {
            config: self.config,
            upstream,
            backoff: self.backoff,
        }
    }

    /// Replaces the linear reconnect delay policy.
    pub fn backoff<B2: Backoff>(self, backoff: B2) -> GridClientBuilder<U, B2> {
        GridClientBuilder {
            config: self.config,
            upstream: self.upstream,
            backoff: Some(backoff),
        }
    }

    /// Resolves the endpoint and starts connecting over WebSocket.
    ///
    /// Returns as soon as the background connection task is running; the
    /// socket itself may not be open yet. Must be called from within a
    /// Tokio runtime.
    ///
    /// # Errors
    /// Fails if the endpoint cannot be resolved (see
    /// [`ClientConfig::resolve_url`]), or with
    /// [`GridlinkError::TlsUnavailable`] for a `wss://` endpoint when the
    /// `tls` feature is off.
    pub fn connect(self) -> Result<GridClient<U>, GridlinkError> {
        let url = self.config.resolve_url()?;
        require_tls_support(&url, gridlink_transport::TLS_SUPPORTED)?;
        let connector = gridlink_transport::WebSocketConnector::new(url.as_str());
        Ok(self.connect_with(connector, url))
    }

    /// Starts the client over any [`Connector`].
    ///
    /// `url` is informational only; `connector` decides where to dial.
    pub fn connect_with<C: Connector>(self, connector: C, url: Url) -> GridClient<U> {
        let config = self.config.validated();

        let notifier = Arc::new(StateNotifier::new(ProtocolLock::new()));
        let mailbox = Arc::new(ResponseMailbox::new());
        let dispatcher = Dispatcher::new(Arc::clone(&notifier), Arc::clone(&mailbox));

        let builder = ConnectionManager::builder(connector)
            .reconnect_config(config.reconnect.clone())
            .on_frame(move |frame| {
                dispatcher.handle_frame(frame);
            });
        let manager = match self.backoff {
            Some(backoff) => builder.backoff(backoff).connect(),
            None => builder.connect(),
        };

        let session = Arc::new(
            ExclusiveMoveSession::new(
                manager.clone(),
                Arc::clone(&notifier),
                Arc::clone(&mailbox),
            )
            .with_config(config.session.clone()),
        );

        tracing::info!(%url, "grid client started");
        GridClient {
            url,
            manager,
            notifier,
            mailbox,
            session,
            upstream: self.upstream,
            governor: config.governor,
        }
    }
}

/// Refuses secure endpoints the connector could never reach.
fn require_tls_support(url: &Url, tls: bool) -> Result<(), GridlinkError> {
    if url.scheme() == "wss" && !tls {
        return Err(GridlinkError::TlsUnavailable(url.to_string()));
    }
    Ok(())
}

/// A connected game client.
///
/// Dropping it stops the background connection task.
pub struct GridClient<U = NoUpstream> {
    url: Url,
    manager: ConnectionManager,
    notifier: Arc<StateNotifier>,
    mailbox: Arc<ResponseMailbox<ServerState>>,
    session: Arc<ExclusiveMoveSession<ConnectionManager>>,
    upstream: U,
    governor: GovernorConfig,
}

impl GridClient {
    /// Creates a new builder.
    pub fn builder() -> GridClientBuilder {
        GridClientBuilder::new()
    }
}

impl<U: Upstream> GridClient<U> {
    /// The resolved endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Registers a callback for every fresh snapshot, from push updates
    /// and move responses alike.
    ///
    /// Runs on the connection's reader task (or the task that called
    /// [`move_to`](Self::move_to)), so keep it short and never call back
    /// into the client from it.
    pub fn on_new_state<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ServerState) + Send + Sync + 'static,
    {
        self.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Moves the local player. See [`ExclusiveMoveSession::move_to`].
    pub async fn move_to(&self, grid_x: u32, grid_y: u32, fov: FieldOfView) -> MoveOutcome {
        self.session.move_to(grid_x, grid_y, fov).await
    }

    /// Builds a [`MoveGovernor`] over this client's session.
    pub fn governor<W: LocalWorld>(&self, world: Arc<W>) -> MoveGovernor<W, ConnectionManager> {
        MoveGovernor::new(world, Arc::clone(&self.session), self.governor.clone())
    }

    /// Fetches the game parameters from the upstream.
    ///
    /// # Errors
    /// Whatever the [`Upstream`] returns.
    pub async fn get_config(&self) -> Result<GameConfig, GridlinkError> {
        self.upstream.get_config().await
    }

    /// Fetches a snapshot from the upstream.
    ///
    /// # Errors
    /// Whatever the [`Upstream`] returns.
    pub async fn get_state(&self, with_stats: bool) -> Result<Option<ServerState>, GridlinkError> {
        self.upstream.get_state(with_stats).await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.manager.watch_state()
    }

    /// `time` of the last snapshot observers saw.
    pub fn last_update_time(&self) -> u64 {
        self.notifier.last_update_time()
    }

    pub fn stats(&self) -> NotifierStats {
        self.notifier.stats()
    }

    /// Shuts the connection down for good and fails any move still
    /// waiting for its response.
    pub fn close(&self) {
        tracing::info!(url = %self.url, "closing grid client");
        self.manager.close();
        self.mailbox.close();
    }
}
