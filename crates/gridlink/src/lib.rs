//! # gridlink
//!
//! Realtime client for a shared, server-authoritative grid world.
//!
//! One WebSocket carries both pushed world snapshots and the answers to
//! move requests. gridlink keeps that connection alive, makes sure only
//! one move is in flight at a time, and hands observers only snapshots
//! that are newer than anything they have already seen.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gridlink::prelude::*;
//!
//! # async fn run(config: GameConfig, initial: ServerState) -> Result<(), GridlinkError> {
//! gridlink::init_tracing();
//!
//! let client = GridClient::builder().host("grid.example.com").connect()?;
//!
//! let world = Arc::new(GameState::new(config, initial));
//! let w = Arc::clone(&world);
//! client.on_new_state(move |state| w.apply(state));
//!
//! let governor = client.governor(Arc::clone(&world));
//! governor.on_gesture(GridPos::new(2, 3)).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - `gridlink-transport`: reconnecting socket, backoff, offline buffer
//! - `gridlink-protocol`: wire types and the LZ4+JSON codec
//! - `gridlink-sync`: protocol lock, response mailbox, state notifier
//!
//! ## Feature Flags
//!
//! - `tls`: lets the client dial `wss://` endpoints. Endpoints resolved
//!   from a host are always `wss://`, so without it
//!   [`GridClientBuilder::connect`] returns
//!   [`GridlinkError::TlsUnavailable`] for them.

mod client;
mod config;
mod error;
mod governor;
mod logging;
mod upstream;
mod world;

pub use client::{GridClient, GridClientBuilder};
pub use config::{ClientConfig, DEFAULT_MOVE_FALLBACK, DEFAULT_WS_PATH, GovernorConfig};
pub use error::GridlinkError;
pub use governor::{GestureOutcome, MoveGovernor};
pub use logging::{DEFAULT_FILTER, init_tracing};
pub use upstream::{NoUpstream, StaticUpstream, Upstream};
pub use world::{GameState, LocalWorld, Viewport};

pub use gridlink_protocol as protocol;
pub use gridlink_sync as sync;
pub use gridlink_transport as transport;

/// The types most applications need.
pub mod prelude {
    pub use crate::{
        ClientConfig, GameState, GestureOutcome, GridClient, GridlinkError, LocalWorld,
        MoveGovernor, Upstream, Viewport,
    };
    pub use gridlink_protocol::{FieldOfView, GameConfig, GridPos, PlayerState, ServerState};
    pub use gridlink_sync::{MoveOutcome, Offer, SubscriptionId};
    pub use gridlink_transport::ConnectionState;
}
