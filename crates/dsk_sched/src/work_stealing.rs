// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZero;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use dsk_core::Continuation;

use crate::scheduler::Scheduler;

const ERR_POISONED_LOCK: &str = "lock poisoned by a prior panic while holding it";

struct StateInner {
    stop: bool,
    jobs: VecDeque<Continuation>,
}

struct ThreadState {
    inner: Mutex<StateInner>,
    cv: Condvar,
}

impl ThreadState {
    fn new() -> Self {
        Self {
            inner: Mutex::new(StateInner {
                stop: false,
                jobs: VecDeque::new(),
            }),
            cv: Condvar::new(),
        }
    }

    /// Non-blocking pop: gives up immediately if the lock is contended.
    fn try_pop(&self) -> Option<Continuation> {
        let mut guard = self.inner.try_lock().ok()?;
        guard.jobs.pop_front()
    }

    /// Blocking pop: waits for either a job or a stop request.
    fn pop(&self) -> Option<Continuation> {
        let mut guard = self.inner.lock().expect(ERR_POISONED_LOCK);

        loop {
            if !guard.jobs.is_empty() {
                break;
            }

            if guard.stop {
                return None;
            }

            guard = self.cv.wait(guard).expect(ERR_POISONED_LOCK);
        }

        guard.jobs.pop_front()
    }

    /// Non-blocking push: gives `job` back if the lock is contended.
    fn try_push(&self, job: Continuation) -> Result<(), Continuation> {
        let Ok(mut guard) = self.inner.try_lock() else {
            return Err(job);
        };

        let was_empty = guard.jobs.is_empty();
        guard.jobs.push_back(job);

        if was_empty {
            self.cv.notify_one();
        }

        Ok(())
    }

    fn push(&self, job: Continuation) {
        let mut guard = self.inner.lock().expect(ERR_POISONED_LOCK);
        let was_empty = guard.jobs.is_empty();
        guard.jobs.push_back(job);

        if was_empty {
            self.cv.notify_one();
        }
    }

    fn request_stop(&self) {
        let mut guard = self.inner.lock().expect(ERR_POISONED_LOCK);
        guard.stop = true;
        self.cv.notify_one();
    }
}

/// A scheduler with one job deque per worker thread. `post` round-robins a
/// cursor across workers; each worker first tries a non-blocking pop on its
/// own deque, then peeks at every peer in turn, then falls back to a
/// blocking pop on its own deque. Idle workers picking up a busy peer's
/// backlog is the "stealing" - there is no true per-thread Chase-Lev deque
/// here, just the same try-everywhere-then-block shape the C++ original's
/// `simple_thread_pool_t` uses.
pub struct WorkStealingPool {
    states: Mutex<Vec<Arc<ThreadState>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    next: AtomicUsize,
    max_concurrency: NonZero<usize>,
}

impl WorkStealingPool {
    /// Creates a pool that will run `max_concurrency` worker threads once
    /// started.
    #[must_use]
    pub fn new(max_concurrency: NonZero<usize>) -> Self {
        Self {
            states: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
            next: AtomicUsize::new(0),
            max_concurrency,
        }
    }

    /// Creates a pool sized to the number of available processors.
    #[must_use]
    pub fn with_default_concurrency() -> Self {
        let n = many_cpus::ProcessorSet::default()
            .map_or(1, |set| set.processors().len())
            .max(1);
        Self::new(NonZero::new(n).unwrap_or(NonZero::<usize>::MIN))
    }
}

impl fmt::Debug for WorkStealingPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkStealingPool")
            .field("max_concurrency", &self.max_concurrency)
            .field("is_started", &self.is_started())
            .finish()
    }
}

impl Scheduler for WorkStealingPool {
    fn post(&self, job: Continuation) {
        debug_assert!(self.is_started(), "post() called before start()");

        let states = self.states.lock().expect(ERR_POISONED_LOCK);
        let n = states.len();
        if n == 0 {
            return;
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % n;
        let mut job = job;

        for i in 0..n {
            match states[(index + i) % n].try_push(job) {
                Ok(()) => return,
                Err(returned) => job = returned,
            }
        }

        // Every deque was contended; block on the one `post` originally chose.
        states[index].push(job);
    }

    fn start(&self) {
        let mut states = self.states.lock().expect(ERR_POISONED_LOCK);
        let mut threads = self.threads.lock().expect(ERR_POISONED_LOCK);
        debug_assert!(states.is_empty(), "start() called while already started");
        debug_assert!(threads.is_empty());

        let n = self.max_concurrency.get();
        *states = (0..n).map(|_| Arc::new(ThreadState::new())).collect();

        for index in 0..n {
            let states: Vec<Arc<ThreadState>> = states.clone();
            threads.push(thread::spawn(move || loop {
                let mut job = None;

                for i in 0..n {
                    job = states[(index + i) % n].try_pop();
                    if job.is_some() {
                        break;
                    }
                }

                let job = match job {
                    Some(job) => job,
                    None => match states[index].pop() {
                        Some(job) => job,
                        None => return,
                    },
                };

                job.invoke();
            }));
        }
    }

    fn stop(&self) {
        let states = self.states.lock().expect(ERR_POISONED_LOCK);
        for state in states.iter() {
            state.request_stop();
        }
    }

    fn join(&self) {
        let mut threads = self.threads.lock().expect(ERR_POISONED_LOCK);
        for thread in threads.drain(..) {
            let _ = thread.join();
        }
        self.states.lock().expect(ERR_POISONED_LOCK).clear();
        self.next.store(0, Ordering::Relaxed);
    }

    fn is_started(&self) -> bool {
        !self.states.lock().expect(ERR_POISONED_LOCK).is_empty()
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::sync::mpsc;

    #[test]
    fn runs_posted_jobs() {
        let pool = WorkStealingPool::new(NonZero::new(2).unwrap());
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

        pool.stop_and_join();
    }

    #[test]
    fn restart_allows_reuse() {
        let pool = WorkStealingPool::new(NonZero::new(1).unwrap());
        pool.start();

        let count = Arc::new(StdAtomicUsize::new(0));
        let c = Arc::clone(&count);
        pool.post(Continuation::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        pool.stop_and_join();

        pool.start();
        let c = Arc::clone(&count);
        pool.post(Continuation::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        pool.stop_and_join();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
