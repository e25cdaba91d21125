//! A bounded worker pool that runs a user-supplied function over a dynamically growing set
//! of jobs, using at most `N` parallel OS threads against one logical destination.
//!
//! The tracker is single-use: build it, `add_job`/`add_jobs` a seed set (optionally more
//! while it runs, from inside a worker), then [`start_and_wait`][JobTracker::start_and_wait]
//! once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

/// How long a worker naps between checks once the queue has gone empty.
const NAP_INTERVAL: Duration = Duration::from_millis(100);
/// How many consecutive empty naps a worker tolerates before giving up.
const DEFAULT_GRACE_TIMES: u32 = 5;

/// A handle workers use to submit follow-up jobs while the tracker is running.
#[derive(Clone)]
pub struct Handle<J> {
    sender: Sender<J>,
    outstanding: Arc<AtomicUsize>,
}

impl<J> Handle<J> {
    /// Enqueue a single job. Non-blocking; idempotent jobs may be re-enqueued freely, as
    /// de-duplication happens inside the worker, not here.
    pub fn add_job(&self, job: J) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        // The receiving side only ever goes away once every worker thread has exited,
        // which can't happen while this handle's owning worker is still running.
        let _ = self.sender.send(job);
    }
}

/// Runs `worker` over jobs drawn from an internal MPMC queue, with up to `max_parallel`
/// threads bound to a cloned `context`.
pub struct JobTracker<J> {
    sender: Sender<J>,
    receiver: Receiver<J>,
    max_parallel: usize,
    outstanding: Arc<AtomicUsize>,
}

impl<J: Send + 'static> JobTracker<J> {
    pub fn new(max_parallel: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            max_parallel: max_parallel.max(1),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seed a single job before starting.
    pub fn add_job(&self, job: J) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(job);
    }

    /// Seed a batch of jobs before starting.
    pub fn add_jobs(&self, jobs: impl IntoIterator<Item = J>) {
        for job in jobs {
            self.add_job(job);
        }
    }

    /// Start up to `max_parallel` worker threads bound to `context` and block until every
    /// one of them has exited via the napper's grace-period drain.
    ///
    /// `napper_enabled` controls whether a worker, upon finding the queue empty, waits
    /// through [`DEFAULT_GRACE_TIMES`] naps (in case a sibling worker is about to enqueue a
    /// follow-up job) or exits immediately. Phases whose workers never re-enqueue pass
    /// `false` to shut down as soon as possible.
    pub fn start_and_wait<C, F>(self, context: C, napper_enabled: bool, worker: F)
    where
        C: Clone + Send + 'static,
        F: Fn(&Handle<J>, J, &C) + Send + Sync + 'static,
    {
        let worker = Arc::new(worker);
        let grace_times = if napper_enabled { DEFAULT_GRACE_TIMES } else { 0 };

        let handles: Vec<_> = (0..self.max_parallel)
            .map(|_| {
                let receiver = self.receiver.clone();
                let sender = self.sender.clone();
                let outstanding = self.outstanding.clone();
                let context = context.clone();
                let worker = worker.clone();
                std::thread::spawn(move || {
                    let job_handle = Handle {
                        sender,
                        outstanding: outstanding.clone(),
                    };
                    let mut grace_remaining = grace_times;
                    loop {
                        match receiver.try_recv() {
                            Ok(job) => {
                                grace_remaining = grace_times;
                                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                    worker(&job_handle, job, &context);
                                }));
                                if let Err(panic) = result {
                                    tracing::error!(?panic, "worker job panicked, continuing with next job");
                                }
                                outstanding.fetch_sub(1, Ordering::SeqCst);
                            }
                            Err(crossbeam_channel::TryRecvError::Empty) => {
                                if outstanding.load(Ordering::SeqCst) == 0 && grace_remaining == 0 {
                                    break;
                                }
                                std::thread::sleep(NAP_INTERVAL);
                                if grace_remaining > 0 {
                                    grace_remaining -= 1;
                                }
                            }
                            Err(crossbeam_channel::TryRecvError::Disconnected) => break,
                        }
                    }
                })
            })
            .collect();

        // Drop our own sender so the channel can be observed as closed once every worker's
        // clone has also gone away (it never does while workers run, but this avoids
        // keeping it alive past `start_and_wait` returning).
        drop(self.sender);

        for handle in handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn drains_without_reenqueue() {
        let tracker = JobTracker::new(4);
        tracker.add_jobs(0..20);
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = seen.clone();
        tracker.start_and_wait((), false, move |_handle, _job: i32, _ctx: &()| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn worker_can_reenqueue_follow_up_jobs() {
        let tracker = JobTracker::new(4);
        tracker.add_jobs(0..5);
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = seen.clone();
        tracker.start_and_wait((), true, move |handle, job: i32, _ctx: &()| {
            seen2.fetch_add(1, Ordering::SeqCst);
            if job < 10 {
                handle.add_job(job + 5);
            }
        });
        // 0..5 plus each job < 10 spawning one follow-up: 0..5 -> 5..10 -> stop.
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn panicking_job_does_not_stop_the_pool() {
        let tracker = JobTracker::new(2);
        tracker.add_jobs(0..4);
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = seen.clone();
        tracker.start_and_wait((), false, move |_handle, job: i32, _ctx: &()| {
            if job == 1 {
                panic!("boom");
            }
            seen2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
