//! The protocol-level move lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct Inner {
    mutex: Arc<Mutex<()>>,
    held: AtomicBool,
}

/// Serializes move operations on one connection.
///
/// A thin wrapper over `tokio::sync::Mutex<()>`, which queues waiters in
/// FIFO order. The extra `held` flag lets the notifier ask "is a move in
/// flight?" without touching the mutex itself.
///
/// There is no timeout: a move that never gets its response keeps the
/// lock.
#[derive(Debug, Clone, Default)]
pub struct ProtocolLock {
    inner: Arc<Inner>,
}

impl ProtocolLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock. Callers are served in arrival order.
    pub async fn acquire(&self) -> ProtocolGuard {
        let guard = Arc::clone(&self.inner.mutex).lock_owned().await;
        self.inner.held.store(true, Ordering::Release);
        ProtocolGuard {
            inner: Arc::clone(&self.inner),
            _guard: guard,
        }
    }

    /// Returns `true` while some move holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.held.load(Ordering::Acquire)
    }
}

/// Releases the [`ProtocolLock`] on drop.
#[derive(Debug)]
pub struct ProtocolGuard {
    inner: Arc<Inner>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for ProtocolGuard {
    fn drop(&mut self) {
        // Cleared before the mutex guard (a field) drops, so the next
        // holder's `store(true)` always lands after this one.
        self.inner.held.store(false, Ordering::Release);
    }
}
