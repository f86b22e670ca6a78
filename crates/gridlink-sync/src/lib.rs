//! Client-side synchronization for gridlink.
//!
//! One connection carries two kinds of server traffic: pushed
//! `state-update`s and the `move-response` to the single outstanding
//! `move-request`. This crate keeps them apart and decides which snapshot
//! observers get to see.
//!
//! ```text
//! Frame → Dispatcher ─ state-update ──→ StateNotifier ──→ observers
//!                    └ move-response ─→ ResponseMailbox
//!                                            ↑ await_value
//! move_to → ExclusiveMoveSession ─ offer (after unlock) ─→ StateNotifier
//! ```
//!
//! - [`ProtocolLock`]: at most one move in flight; push updates are
//!   suppressed while it is held.
//! - [`ResponseMailbox`]: single-slot handoff, overwrite on redelivery.
//! - [`StateNotifier`]: drops anything not newer than the last delivered
//!   snapshot.

mod dispatcher;
mod error;
mod lock;
mod mailbox;
mod notifier;
mod session;

pub use dispatcher::{Dispatcher, Route};
pub use error::SyncError;
pub use lock::{ProtocolGuard, ProtocolLock};
pub use mailbox::ResponseMailbox;
pub use notifier::{NotifierStats, Observer, Offer, StateNotifier, SubscriptionId};
pub use session::{ExclusiveMoveSession, MoveOutcome, SessionConfig};
