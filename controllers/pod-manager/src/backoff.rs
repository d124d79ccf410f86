//! # Fibonacci Backoff
//!
//! Progressive retry delays for failed reconciliations. The sequence grows
//! more slowly than exponential backoff: with a 1s minimum and 300s cap it
//! runs 1s, 1s, 2s, 3s, 5s, 8s, ... 233s, 300s.
//!
//! [`BackoffTracker`] keeps one sequence per PodManager so a misbehaving
//! object never slows down retries for the others.

use cluster_client::ObjectKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max_seconds`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous backoff value in seconds
    prev_seconds: u64,
    /// Current backoff value in seconds
    current_seconds: u64,
    /// Maximum backoff value in seconds
    max_seconds: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff between `min` and `max`.
    ///
    /// Durations are truncated to whole seconds; a zero minimum is raised to one.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min_seconds = min.as_secs().max(1);
        Self {
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds: max.as_secs().max(min_seconds),
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_seconds;

        let next_seconds = self.prev_seconds.saturating_add(self.current_seconds);
        self.prev_seconds = self.current_seconds;
        self.current_seconds = std::cmp::min(next_seconds, self.max_seconds);

        result_seconds
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }
}

/// Per-PodManager retry delays for the dispatcher's error policy.
#[derive(Debug)]
pub struct BackoffTracker {
    min: Duration,
    max: Duration,
    sequences: Mutex<HashMap<ObjectKey, FibonacciBackoff>>,
}

impl BackoffTracker {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            sequences: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before retrying `key` after a failed reconciliation.
    ///
    /// Recoverable failures advance the object's Fibonacci sequence.
    /// Anything else waits the full cap, since retrying sooner cannot help.
    pub fn delay_for(&self, key: &ObjectKey, recoverable: bool) -> Duration {
        if !recoverable {
            return self.max;
        }
        let mut sequences = self
            .sequences
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sequences
            .entry(key.clone())
            .or_insert_with(|| FibonacciBackoff::new(self.min, self.max))
            .next_backoff()
    }

    /// Forget the failure history of `key` after a successful reconciliation.
    pub fn reset(&self, key: &ObjectKey) {
        self.sequences
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
    }

    /// Number of objects with retry state.
    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.sequences
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Shortest retry delay.
    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Longest retry delay.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(secs(1), secs(300));

        let sequence: Vec<u64> = (0..8).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(sequence, vec![1, 1, 2, 3, 5, 8, 13, 21]);
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(secs(1), secs(10));

        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 2);
        assert_eq!(backoff.next_backoff_seconds(), 3);
        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 8);
        // 13 capped
        assert_eq!(backoff.next_backoff_seconds(), 10);
        assert_eq!(backoff.next_backoff_seconds(), 10);
    }

    #[test]
    fn test_zero_minimum_is_raised() {
        let mut backoff = FibonacciBackoff::new(Duration::ZERO, secs(5));
        assert_eq!(backoff.next_backoff(), secs(1));
    }

    #[test]
    fn test_tracker_keeps_sequences_per_object() {
        let tracker = BackoffTracker::new(secs(1), secs(300));
        let web = ObjectKey::new("default", "web");
        let db = ObjectKey::new("default", "db");

        assert_eq!(tracker.delay_for(&web, true), secs(1));
        assert_eq!(tracker.delay_for(&web, true), secs(1));
        assert_eq!(tracker.delay_for(&web, true), secs(2));
        // db starts fresh
        assert_eq!(tracker.delay_for(&db, true), secs(1));
        assert_eq!(tracker.delay_for(&web, true), secs(3));
    }

    #[test]
    fn test_tracker_reset_restarts_sequence() {
        let tracker = BackoffTracker::new(secs(1), secs(300));
        let web = ObjectKey::new("default", "web");

        tracker.delay_for(&web, true);
        tracker.delay_for(&web, true);
        assert_eq!(tracker.delay_for(&web, true), secs(2));

        tracker.reset(&web);
        assert_eq!(tracker.delay_for(&web, true), secs(1));
    }

    #[test]
    fn test_unrecoverable_errors_wait_the_cap() {
        let tracker = BackoffTracker::new(secs(1), secs(300));
        let web = ObjectKey::new("default", "web");

        assert_eq!(tracker.delay_for(&web, false), secs(300));
        // does not consume the recoverable sequence
        assert_eq!(tracker.delay_for(&web, true), secs(1));
    }
}
