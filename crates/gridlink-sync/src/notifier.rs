//! Freshness-gated fan-out of world snapshots to observers.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gridlink_protocol::ServerState;

use crate::ProtocolLock;

/// Callback invoked with every accepted snapshot.
pub type Observer = Arc<dyn Fn(&ServerState) + Send + Sync>;

/// Handle returned by [`StateNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What [`StateNotifier::offer`] did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Fresh: the watermark advanced and every observer was called.
    Notified,
    /// `time` was not newer than the watermark; dropped.
    Stale,
    /// A move held the protocol lock; recorded but not delivered.
    Suppressed,
}

/// Counters for how offers were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifierStats {
    pub notified: u64,
    pub stale: u64,
    pub suppressed: u64,
}

struct Inner {
    last_update_time: u64,
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer)>,
    stats: NotifierStats,
    last_suppressed: Option<ServerState>,
}

/// Decides which snapshots reach observers.
///
/// Three rules, checked in order on every [`offer`](Self::offer):
///
/// 1. While the [`ProtocolLock`] is held, nothing is delivered. The move
///    in flight will produce its own, authoritative snapshot.
/// 2. A snapshot whose `time` is not strictly newer than the last
///    delivered one is dropped.
/// 3. Otherwise the watermark advances and every observer is called, in
///    subscription order, before `offer` returns.
///
/// The check and the notification happen under one internal lock, so an
/// observer must not call back into the notifier or acquire the protocol
/// lock.
pub struct StateNotifier {
    lock: ProtocolLock,
    inner: Mutex<Inner>,
}

impl fmt::Debug for StateNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner();
        f.debug_struct("StateNotifier")
            .field("last_update_time", &inner.last_update_time)
            .field("observers", &inner.observers.len())
            .field("stats", &inner.stats)
            .finish()
    }
}

impl StateNotifier {
    /// Creates a notifier gated by `lock`.
    pub fn new(lock: ProtocolLock) -> Self {
        Self {
            lock,
            inner: Mutex::new(Inner {
                last_update_time: 0,
                next_id: 1,
                observers: Vec::new(),
                stats: NotifierStats::default(),
                last_suppressed: None,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The lock this notifier defers to.
    pub fn lock(&self) -> &ProtocolLock {
        &self.lock
    }

    /// Registers an observer. It sees only snapshots accepted after this
    /// call.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ServerState) + Send + Sync + 'static,
    {
        let mut inner = self.inner();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(observer)));
        tracing::debug!(%id, "observer subscribed");
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner();
        let before = inner.observers.len();
        inner.observers.retain(|(sub, _)| *sub != id);
        before != inner.observers.len()
    }

    /// Offers a snapshot to observers.
    pub fn offer(&self, state: ServerState) -> Offer {
        let mut inner = self.inner();

        if self.lock.is_locked() {
            tracing::debug!(time = state.time, "move in flight, not notifying observers");
            inner.stats.suppressed += 1;
            inner.last_suppressed = Some(state);
            return Offer::Suppressed;
        }

        if state.time <= inner.last_update_time {
            tracing::debug!(
                time = state.time,
                last_update_time = inner.last_update_time,
                "stale state, not notifying observers"
            );
            inner.stats.stale += 1;
            return Offer::Stale;
        }

        inner.last_update_time = state.time;
        inner.stats.notified += 1;
        for (_, observer) in &inner.observers {
            observer(&state);
        }
        Offer::Notified
    }

    /// `time` of the last delivered snapshot, or 0 before the first.
    pub fn last_update_time(&self) -> u64 {
        self.inner().last_update_time
    }

    pub fn stats(&self) -> NotifierStats {
        self.inner().stats
    }

    /// The most recent snapshot held back by the protocol lock.
    ///
    /// Kept for inspection only; it is never replayed to observers.
    pub fn last_suppressed(&self) -> Option<ServerState> {
        self.inner().last_suppressed.clone()
    }

    pub fn observer_count(&self) -> usize {
        self.inner().observers.len()
    }
}
