//! Reconnect delay policies.

use std::time::Duration;

/// Produces the delay to wait before each reconnection attempt.
///
/// The manager calls [`next_delay`](Backoff::next_delay) after every
/// closure or failed attempt, and [`reset`](Backoff::reset) after every
/// successful connection.
pub trait Backoff: Send + 'static {
    /// Returns the delay before the next attempt and advances the policy.
    fn next_delay(&mut self) -> Duration;

    /// Returns the policy to its initial delay.
    fn reset(&mut self);
}

/// Linear backoff: `initial`, `initial + step`, `initial + 2*step`, ...
/// capped at `max`.
///
/// ```
/// use std::time::Duration;
/// use gridlink_transport::{Backoff, LinearBackoff};
///
/// let mut backoff = LinearBackoff::new(
///     Duration::ZERO,
///     Duration::from_secs(1),
///     Duration::from_secs(5),
/// );
/// assert_eq!(backoff.next_delay(), Duration::ZERO);
/// assert_eq!(backoff.next_delay(), Duration::from_secs(1));
/// assert_eq!(backoff.next_delay(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    initial: Duration,
    step: Duration,
    max: Duration,
    next: Duration,
}

impl LinearBackoff {
    /// Creates a linear backoff. `initial` is clamped to `max`.
    pub fn new(initial: Duration, step: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            step,
            max,
            next: initial,
        }
    }

    /// The delay the next call to `next_delay` will return.
    pub fn peek(&self) -> Duration {
        self.next
    }
}

impl Default for LinearBackoff {
    /// 0 ms, then +1000 ms per attempt, capped at 5000 ms.
    fn default() -> Self {
        Self::new(
            Duration::ZERO,
            Duration::from_millis(1000),
            Duration::from_millis(5000),
        )
    }
}

impl Backoff for LinearBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_add(self.step).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.next = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_default_sequence_is_linear_and_capped() {
        let mut b = LinearBackoff::default();
        let delays: Vec<_> = (0..8).map(|_| b.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                ms(0),
                ms(1000),
                ms(2000),
                ms(3000),
                ms(4000),
                ms(5000),
                ms(5000),
                ms(5000)
            ]
        );
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut b = LinearBackoff::default();
        b.next_delay();
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.next_delay(), ms(0));
        assert_eq!(b.next_delay(), ms(1000));
    }

    #[test]
    fn test_initial_clamped_to_max() {
        let mut b = LinearBackoff::new(ms(9000), ms(1000), ms(5000));
        assert_eq!(b.next_delay(), ms(5000));
        assert_eq!(b.next_delay(), ms(5000));
    }

    #[test]
    fn test_peek_does_not_advance() {
        let b = LinearBackoff::default();
        assert_eq!(b.peek(), ms(0));
        assert_eq!(b.peek(), ms(0));
    }
}
