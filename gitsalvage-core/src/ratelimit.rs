//! Process-wide (per-[`Engine`][crate::Engine]) coordination of HTTP 429 cool-down.
//!
//! The gate is intentionally sloppy: it doesn't use a condition variable, just a pair of
//! compare-and-swap flags. Concurrent workers converge on roughly the same resume time
//! without blocking each other on a lock.

use std::{
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
    time::Duration,
};

/// How long a rate-limited worker sleeps before the gate is cleared again.
const COOL_DOWN: Duration = Duration::from_secs(2 * 60);

/// Shared rate-limit state for one crawl invocation.
#[derive(Default)]
pub struct Gate {
    limited: AtomicBool,
    event_count: AtomicU32,
    unsetting: AtomicBool,
}

impl Gate {
    /// Create a fresh, un-limited gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a 429 response. Only the first caller to observe the 0 → 1 transition bumps
    /// the event counter, so concurrently-arriving 429s for the same outage count once.
    pub fn enter(&self) {
        if self
            .limited
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let count = self.event_count.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::warn!(count, "server is rate limiting us, waiting...");
        }
    }

    /// Called by every network worker before issuing a request. Blocks for the cool-down
    /// period if the gate is currently tripped; the single worker that wins the `unsetting`
    /// race clears the flag afterwards.
    pub fn check(&self) {
        if self.limited.load(Ordering::SeqCst) {
            let unset = self
                .unsetting
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok();
            std::thread::sleep(COOL_DOWN);
            if unset {
                self.limited.store(false, Ordering::SeqCst);
                self.unsetting.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Number of distinct rate-limit events observed so far.
    pub fn event_count(&self) -> u32 {
        self.event_count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn single_event_for_concurrent_429s() {
        let gate = Arc::new(Gate::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            handles.push(std::thread::spawn(move || gate.enter()));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(gate.event_count(), 1);
    }

    #[test]
    fn check_is_a_noop_when_not_limited() {
        let gate = Gate::new();
        let start = std::time::Instant::now();
        gate.check();
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
