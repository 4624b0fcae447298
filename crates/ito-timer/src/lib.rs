//! Keyed one-shot timers for the ito party server.
//!
//! Rooms need a handful of delayed actions: the majority-vote countdown,
//! the per-player disconnect grace window, and the whole-room abandonment
//! window. Each is identified by a key (for example "countdown for room
//! K7QM"), fires at most once, and can be cancelled at any time.
//!
//! # Guarantees
//!
//! - At most one timer is live per key. Scheduling a key that already has
//!   a timer cancels the old one first.
//! - Cancelling is idempotent; cancelling an unknown or already-fired key
//!   returns `false` and does nothing.
//! - A superseded timer never runs its action, even if its sleep had
//!   already elapsed when it was replaced.
//!
//! A timer whose action has *started* is no longer registered, so it
//! cannot be cancelled. Actions that take a lock before acting should
//! re-check that they are still wanted (for example by comparing the
//! deadline they were scheduled with).
//!
//! # Integration
//!
//! ```ignore
//! let timers = TimerRegistry::new();
//! let deadline = Instant::now() + Duration::from_secs(30);
//! timers.schedule_at(TimerKey::Countdown(code.clone()), deadline, async move {
//!     coordinator.countdown_elapsed(code, deadline).await;
//! });
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{self, Instant};
use tracing::trace;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Entry {
    generation: u64,
    deadline: Instant,
    handle: AbortHandle,
}

struct Timers<K> {
    next_generation: u64,
    entries: HashMap<K, Entry>,
}

/// A set of pending one-shot timers, at most one per key.
///
/// Cheap to clone; clones share the same timers.
pub struct TimerRegistry<K> {
    inner: Arc<Mutex<Timers<K>>>,
}

impl<K> Clone for TimerRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Default for TimerRegistry<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Timers {
                next_generation: 0,
                entries: HashMap::new(),
            })),
        }
    }
}

impl<K> std::fmt::Debug for TimerRegistry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("pending", &self.lock().entries.len())
            .finish()
    }
}

impl<K> TimerRegistry<K> {
    // The critical sections below never panic, so a poisoned lock still
    // holds consistent data.
    fn lock(&self) -> std::sync::MutexGuard<'_, Timers<K>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K> TimerRegistry<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` after `delay` unless cancelled first, replacing any
    /// timer already scheduled under `key`. Returns the deadline.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F) -> Instant
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_at(key, Instant::now() + delay, action)
    }

    /// Like [`schedule`](Self::schedule) with an absolute deadline, for
    /// actions that need to know their own deadline.
    pub fn schedule_at<F>(&self, key: K, deadline: Instant, action: F) -> Instant
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.lock();

        timers.next_generation += 1;
        let generation = timers.next_generation;

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            {
                let mut timers =
                    inner.lock().unwrap_or_else(PoisonError::into_inner);
                match timers.entries.get(&task_key) {
                    Some(entry) if entry.generation == generation => {
                        timers.entries.remove(&task_key);
                    }
                    // Replaced or cancelled after the sleep elapsed.
                    _ => return,
                }
            }
            trace!(key = ?task_key, "timer fired");
            action.await;
        })
        .abort_handle();

        if let Some(old) = timers.entries.insert(
            key.clone(),
            Entry {
                generation,
                deadline,
                handle,
            },
        ) {
            old.handle.abort();
            trace!(?key, "timer replaced");
        }
        deadline
    }

    /// Cancels the timer under `key`. Returns `true` if one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.lock().entries.remove(key) {
            Some(entry) => {
                entry.handle.abort();
                trace!(?key, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every timer whose key matches `pred`. Returns how many
    /// were pending.
    pub fn cancel_where(&self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let mut timers = self.lock();
        let mut cancelled = 0;
        timers.entries.retain(|key, entry| {
            if pred(key) {
                entry.handle.abort();
                cancelled += 1;
                false
            } else {
                true
            }
        });
        cancelled
    }

    /// Returns `true` if a timer is pending under `key`.
    pub fn is_scheduled(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// The deadline of the timer pending under `key`.
    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.lock().entries.get(key).map(|e| e.deadline)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whole seconds left until `deadline`, rounded up, as shown to players.
/// Returns 0 once the deadline has passed.
pub fn seconds_until(deadline: Instant, now: Instant) -> u64 {
    let left = deadline.saturating_duration_since(now);
    let secs = left.as_secs();
    if left.subsec_nanos() > 0 { secs + 1 } else { secs }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_until_rounds_up() {
        let now = Instant::now();
        assert_eq!(seconds_until(now + Duration::from_millis(29_001), now), 30);
        assert_eq!(seconds_until(now + Duration::from_secs(30), now), 30);
        assert_eq!(seconds_until(now + Duration::from_millis(1), now), 1);
    }

    #[test]
    fn test_seconds_until_past_deadline_is_zero() {
        let now = Instant::now();
        assert_eq!(seconds_until(now, now + Duration::from_secs(5)), 0);
    }
}
