// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::num::NonZero;
use std::sync::Mutex;

use dsk_core::Continuation;
use threadpool::ThreadPool;

use crate::scheduler::Scheduler;
use crate::ERR_POISONED_LOCK;

/// A thin, faithful wrapper over [`threadpool::ThreadPool`]: one shared
/// queue behind a single mutex/condvar (entirely internal to `threadpool`),
/// `max_concurrency` workers pulling from it. No per-worker deques, no
/// stealing - callers that want that shape want [`WorkStealingPool`]
/// instead.
///
/// [`WorkStealingPool`]: crate::WorkStealingPool
pub struct RoundRobinPool {
    pool: Mutex<ThreadPool>,
    max_concurrency: NonZero<usize>,
}

impl RoundRobinPool {
    /// Creates a pool that will run `max_concurrency` worker threads.
    /// Unlike [`WorkStealingPool`](crate::WorkStealingPool), the underlying
    /// `threadpool::ThreadPool` spins its workers up at construction time,
    /// so [`start`](Scheduler::start) is a no-op here.
    #[must_use]
    pub fn new(max_concurrency: NonZero<usize>) -> Self {
        Self {
            pool: Mutex::new(ThreadPool::new(max_concurrency.get())),
            max_concurrency,
        }
    }
}

impl fmt::Debug for RoundRobinPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundRobinPool")
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

impl Scheduler for RoundRobinPool {
    fn post(&self, job: Continuation) {
        self.pool
            .lock()
            .expect(ERR_POISONED_LOCK)
            .execute(move || job.invoke());
    }

    fn start(&self) {
        // `threadpool::ThreadPool` spins its workers up in `new`; nothing to
        // do here beyond what the constructor already did.
    }

    fn stop(&self) {
        // `threadpool` has no cooperative "stop accepting new work" signal
        // short of dropping the pool; `join` is what callers actually want.
    }

    fn join(&self) {
        self.pool.lock().expect(ERR_POISONED_LOCK).join();
    }

    fn is_started(&self) -> bool {
        true
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn runs_posted_jobs() {
        let pool = RoundRobinPool::new(NonZero::new(2).unwrap());
        pool.start();

        let (tx, rx) = mpsc::channel();
        for i in 0..8 {
            let tx = tx.clone();
            pool.post(Continuation::new(move || tx.send(i).unwrap()));
        }
        drop(tx);

        let mut received: Vec<_> = rx.iter().collect();
        received.sort_unstable();
        assert_eq!(received, (0..8).collect::<Vec<_>>());

        pool.join();
    }

    #[test]
    fn max_concurrency_reports_configured_value() {
        let pool = RoundRobinPool::new(NonZero::new(3).unwrap());
        assert_eq!(pool.max_concurrency(), 3);
        assert!(pool.is_started());
    }
}
