//! Single-slot handoff between the reader task and a waiting move.

use std::pin::pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::SyncError;

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    waiting: bool,
    closed: bool,
}

/// A capacity-one mailbox.
///
/// `deliver` never blocks: if nobody is waiting, the value sits in the
/// slot, and a second delivery overwrites the first. `await_value` takes
/// whatever is in the slot, or suspends until something arrives.
///
/// Only one waiter at a time is allowed; a second concurrent
/// `await_value` fails with [`SyncError::MailboxBusy`]. There is no
/// timeout here. Callers that want one wrap the future.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use gridlink_sync::ResponseMailbox;
///
/// let mailbox = ResponseMailbox::new();
/// mailbox.deliver(1);
/// mailbox.deliver(2);
/// assert_eq!(mailbox.await_value().await.unwrap(), 2);
/// # }
/// ```
#[derive(Debug)]
pub struct ResponseMailbox<T> {
    slot: Mutex<Slot<T>>,
    notify: Notify,
}

impl<T> Default for ResponseMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResponseMailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                waiting: false,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Puts a value in the slot, replacing any undelivered one, and wakes
    /// the waiter if there is one.
    ///
    /// Returns `false` if the mailbox is closed and the value was dropped.
    pub fn deliver(&self, value: T) -> bool {
        {
            let mut slot = self.slot();
            if slot.closed {
                tracing::debug!("mailbox closed, dropping delivery");
                return false;
            }
            if slot.value.replace(value).is_some() {
                tracing::debug!("overwrote undelivered value in mailbox");
            }
        }
        self.notify.notify_one();
        true
    }

    /// Takes the next value, waiting for one if the slot is empty.
    ///
    /// Cancel-safe: dropping the future frees the waiter position and
    /// leaves the slot untouched.
    ///
    /// # Errors
    /// [`SyncError::MailboxBusy`] if another task is already waiting,
    /// [`SyncError::MailboxClosed`] if the mailbox is or becomes closed.
    pub async fn await_value(&self) -> Result<T, SyncError> {
        {
            let mut slot = self.slot();
            if slot.closed {
                return Err(SyncError::MailboxClosed);
            }
            if slot.waiting {
                return Err(SyncError::MailboxBusy);
            }
            slot.waiting = true;
        }
        let _waiter = WaiterGuard { mailbox: self };

        loop {
            // Register interest before checking the slot so a delivery in
            // between is not missed.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let mut slot = self.slot();
                if let Some(value) = slot.value.take() {
                    return Ok(value);
                }
                if slot.closed {
                    return Err(SyncError::MailboxClosed);
                }
            }
            notified.await;
        }
    }

    /// Removes an undelivered value without waiting.
    pub fn take_stale(&self) -> Option<T> {
        self.slot().value.take()
    }

    /// Returns `true` if a value is sitting in the slot.
    pub fn has_value(&self) -> bool {
        self.slot().value.is_some()
    }

    /// Returns `true` while a task is suspended in [`await_value`](Self::await_value).
    pub fn has_waiter(&self) -> bool {
        self.slot().waiting
    }

    /// Closes the mailbox: drops any undelivered value, fails the current
    /// waiter, and makes every later `await_value` fail immediately.
    pub fn close(&self) {
        {
            let mut slot = self.slot();
            slot.closed = true;
            slot.value = None;
        }
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.slot().closed
    }
}

struct WaiterGuard<'a, T> {
    mailbox: &'a ResponseMailbox<T>,
}

impl<T> Drop for WaiterGuard<'_, T> {
    fn drop(&mut self) {
        self.mailbox.slot().waiting = false;
    }
}
