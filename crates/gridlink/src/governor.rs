//! The UI-side move gate.
//!
//! A player taps cells; each tap is a gesture. The governor lets one
//! gesture through at a time and drops the rest:
//!
//! ```text
//!   Idle ──gesture──→ Pending ──move done──→ Idle
//!                        │
//!                        └──fallback timer──→ Idle   (move keeps running)
//! ```
//!
//! The UI lock here is separate from the protocol lock inside
//! [`ExclusiveMoveSession`]. The fallback timer only frees the UI; a move
//! still waiting for its response keeps the protocol lock, so a gesture
//! accepted after a fallback queues behind it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gridlink_protocol::{Codec, GridPos, WireCodec};
use gridlink_sync::{ExclusiveMoveSession, MoveOutcome};
use gridlink_transport::FrameSink;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{GovernorConfig, LocalWorld};

/// What happened to a gesture.
#[derive(Debug)]
pub enum GestureOutcome {
    /// Another gesture was still pending; this one was dropped.
    Ignored,
    /// The target failed the local adjacency or bounds check.
    Illegal,
    /// The move ran. The session's outcome is attached.
    Moved(MoveOutcome),
}

struct Pending {
    generation: u64,
    fallback: JoinHandle<()>,
}

#[derive(Default)]
struct GateState {
    generation: u64,
    pending: Option<Pending>,
}

#[derive(Default)]
struct Gate {
    state: Mutex<GateState>,
}

impl Gate {
    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Frees the gate if `generation` still owns it. A late completion of
    /// an old gesture must not release a newer one.
    fn release(&self, generation: u64, fallback_fired: bool) {
        let mut state = self.state();
        let owns = state
            .pending
            .as_ref()
            .is_some_and(|p| p.generation == generation);
        if !owns {
            return;
        }
        if let Some(pending) = state.pending.take() {
            if fallback_fired {
                warn!(generation, "move still running, releasing UI lock on fallback");
            } else {
                pending.fallback.abort();
            }
        }
    }
}

/// Releases the gate when a gesture ends, however it ends.
struct Release<'a> {
    gate: &'a Gate,
    generation: u64,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.gate.release(self.generation, false);
    }
}

/// Turns UI gestures into moves, one at a time.
pub struct MoveGovernor<W, S, C = WireCodec> {
    world: Arc<W>,
    session: Arc<ExclusiveMoveSession<S, C>>,
    gate: Arc<Gate>,
    config: GovernorConfig,
}

impl<W, S, C> MoveGovernor<W, S, C>
where
    W: LocalWorld,
    S: FrameSink,
    C: Codec,
{
    pub fn new(
        world: Arc<W>,
        session: Arc<ExclusiveMoveSession<S, C>>,
        config: GovernorConfig,
    ) -> Self {
        Self {
            world,
            session,
            gate: Arc::new(Gate::default()),
            config: config.validated(),
        }
    }

    pub fn world(&self) -> &Arc<W> {
        &self.world
    }

    /// Returns `true` while a gesture holds the UI lock.
    pub fn is_pending(&self) -> bool {
        self.gate.state().pending.is_some()
    }

    /// Handles a tap on `target`.
    ///
    /// Returns immediately with [`GestureOutcome::Ignored`] if a previous
    /// gesture is still pending. Otherwise takes the UI lock, checks the
    /// target against the local world, runs the move, and releases the
    /// lock. Must be called from within a Tokio runtime.
    pub async fn on_gesture(&self, target: GridPos) -> GestureOutcome {
        let generation = {
            let mut state = self.gate.state();
            if state.pending.is_some() {
                debug!(%target, "previous move not finished, ignoring gesture");
                return GestureOutcome::Ignored;
            }
            state.generation += 1;
            let generation = state.generation;
            state.pending = Some(Pending {
                generation,
                fallback: self.spawn_fallback(generation),
            });
            generation
        };
        let _release = Release {
            gate: &self.gate,
            generation,
        };

        self.world.select(None);

        let from = self.world.player_pos();
        if !from.is_adjacent(&target) || !self.world.try_move_me_to(target) {
            debug!(%from, %target, "illegal move target");
            return GestureOutcome::Illegal;
        }

        self.world.select(Some(target));
        let fov = self.world.field_of_view();
        let outcome = self.session.move_to(target.x, target.y, fov).await;
        self.world.select(None);

        GestureOutcome::Moved(outcome)
    }

    fn spawn_fallback(&self, generation: u64) -> JoinHandle<()> {
        let gate = Arc::clone(&self.gate);
        let fallback = self.config.fallback;
        tokio::spawn(async move {
            tokio::time::sleep(fallback).await;
            gate.release(generation, true);
        })
    }
}
