//! The HTTP side of the game API.
//!
//! The realtime socket only carries updates and moves. The game config
//! and the first snapshot come from plain request/response calls, which
//! this crate does not implement. Plug an implementation of [`Upstream`]
//! into the [`GridClientBuilder`](crate::GridClientBuilder).

use std::future::Future;

use gridlink_protocol::{GameConfig, ServerState};

use crate::GridlinkError;

/// Request/response calls made outside the socket, at startup or as a
/// fallback.
pub trait Upstream: Send + Sync + 'static {
    /// Fetches the static game parameters.
    fn get_config(&self) -> impl Future<Output = Result<GameConfig, GridlinkError>> + Send;

    /// Fetches the current snapshot for this player, if there is one.
    /// `with_stats` asks the server to include [`ServerStats`](gridlink_protocol::ServerStats).
    fn get_state(
        &self,
        with_stats: bool,
    ) -> impl Future<Output = Result<Option<ServerState>, GridlinkError>> + Send;
}

/// The default: no upstream. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpstream;

impl Upstream for NoUpstream {
    async fn get_config(&self) -> Result<GameConfig, GridlinkError> {
        Err(GridlinkError::Upstream("no upstream configured".into()))
    }

    async fn get_state(&self, _with_stats: bool) -> Result<Option<ServerState>, GridlinkError> {
        Err(GridlinkError::Upstream("no upstream configured".into()))
    }
}

/// Serves fixed values. Handy for demos and tests.
#[derive(Debug, Clone)]
pub struct StaticUpstream {
    config: GameConfig,
    state: Option<ServerState>,
}

impl StaticUpstream {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn with_state(mut self, state: ServerState) -> Self {
        self.state = Some(state);
        self
    }
}

impl Upstream for StaticUpstream {
    async fn get_config(&self) -> Result<GameConfig, GridlinkError> {
        Ok(self.config.clone())
    }

    /// Stats are stripped unless asked for.
    async fn get_state(&self, with_stats: bool) -> Result<Option<ServerState>, GridlinkError> {
        Ok(self.state.clone().map(|mut state| {
            if !with_stats {
                state.stats = None;
            }
            state
        }))
    }
}
