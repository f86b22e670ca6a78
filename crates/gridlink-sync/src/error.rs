use std::time::Duration;

/// Errors from the synchronization layer.
///
/// None of these reach the UI: [`ExclusiveMoveSession`](crate::ExclusiveMoveSession)
/// logs them and reports a [`MoveOutcome`](crate::MoveOutcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Someone is already waiting on the mailbox.
    #[error("response mailbox already has a waiter")]
    MailboxBusy,

    /// The mailbox was closed while (or before) waiting.
    #[error("response mailbox closed")]
    MailboxClosed,

    /// No response arrived within the configured window.
    #[error("no move response within {0:?}")]
    ResponseTimeout(Duration),
}
