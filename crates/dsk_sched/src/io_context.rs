// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZero;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dsk_core::Continuation;

use crate::scheduler::Scheduler;
use crate::ERR_POISONED_LOCK;

/// Stand-in for "the underlying networking library's completion context" -
/// concrete transports (IOCP, io_uring, ...) are out of scope here, so
/// [`IoContextPool`] is generic over this trait instead of assuming one.
///
/// A real transport binding would implement this around its own completion
/// port/ring; [`CondvarIoContext`] is the in-tree default, with no
/// completions of its own to process, used whenever nothing more specific
/// is wired in.
pub trait IoContext: fmt::Debug + Send + Sync {
    /// Blocks the calling thread until either a completion is ready to
    /// process or `timeout` elapses, whichever comes first.
    fn process_completions(&self, timeout: Duration);

    /// Wakes one thread currently blocked in [`process_completions`]
    /// (e.g. because new work was posted and a worker should re-check its
    /// queue instead of waiting out its full timeout).
    ///
    /// [`process_completions`]: Self::process_completions
    fn wake(&self);
}

/// The default [`IoContext`]: a condvar wait/notify pair with no completions
/// of its own, equivalent to `dsk_rt`'s thread waker.
#[derive(Debug, Default)]
pub struct CondvarIoContext {
    notified: Mutex<bool>,
    condvar: Condvar,
}

impl CondvarIoContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IoContext for CondvarIoContext {
    fn process_completions(&self, timeout: Duration) {
        let mut notified = self.notified.lock().expect(ERR_POISONED_LOCK);
        if !*notified {
            let (guard, _) = self
                .condvar
                .wait_timeout(notified, timeout)
                .expect(ERR_POISONED_LOCK);
            notified = guard;
        }
        *notified = false;
    }

    fn wake(&self) {
        *self.notified.lock().expect(ERR_POISONED_LOCK) = true;
        self.condvar.notify_one();
    }
}

struct Queue {
    jobs: Mutex<VecDeque<Continuation>>,
    stop: AtomicBool,
}

/// A scheduler backed by a pluggable [`IoContext`]: `max_concurrency`
/// threads each loop popping posted work off a shared queue, falling back
/// to `ctx.process_completions(timeout)` (which also serves as the idle
/// wait) when the queue is empty, so a transport-specific `IoContext` gets
/// a chance to make progress on its own completions between posted jobs.
pub struct IoContextPool<C: IoContext + 'static> {
    ctx: Arc<C>,
    queue: Arc<Queue>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    max_concurrency: NonZero<usize>,
}

impl<C: IoContext + 'static> IoContextPool<C> {
    /// Builds a pool of `max_concurrency` threads driving `ctx`.
    #[must_use]
    pub fn new(ctx: Arc<C>, max_concurrency: NonZero<usize>) -> Self {
        Self {
            ctx,
            queue: Arc::new(Queue {
                jobs: Mutex::new(VecDeque::new()),
                stop: AtomicBool::new(false),
            }),
            threads: Mutex::new(Vec::new()),
            max_concurrency,
        }
    }

    /// The shared [`IoContext`] this pool drives.
    #[must_use]
    pub fn context(&self) -> &Arc<C> {
        &self.ctx
    }
}

impl IoContextPool<CondvarIoContext> {
    /// Convenience constructor for the in-tree default context.
    #[must_use]
    pub fn with_default_context(max_concurrency: NonZero<usize>) -> Self {
        Self::new(Arc::new(CondvarIoContext::new()), max_concurrency)
    }
}

impl<C: IoContext + 'static> fmt::Debug for IoContextPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoContextPool")
            .field("max_concurrency", &self.max_concurrency)
            .field("is_started", &self.is_started())
            .finish_non_exhaustive()
    }
}

const POLL_TIMEOUT: Duration = Duration::from_millis(50);

impl<C: IoContext + 'static> Scheduler for IoContextPool<C> {
    fn post(&self, job: Continuation) {
        debug_assert!(self.is_started(), "post() called before start()");
        self.queue.jobs.lock().expect(ERR_POISONED_LOCK).push_back(job);
        self.ctx.wake();
    }

    fn start(&self) {
        let mut threads = self.threads.lock().expect(ERR_POISONED_LOCK);
        debug_assert!(threads.is_empty(), "start() called while already started");

        self.queue.stop.store(false, Ordering::SeqCst);

        for _ in 0..self.max_concurrency.get() {
            let queue = Arc::clone(&self.queue);
            let ctx = Arc::clone(&self.ctx);

            threads.push(thread::spawn(move || loop {
                let job = queue.jobs.lock().expect(ERR_POISONED_LOCK).pop_front();

                match job {
                    Some(job) => job.invoke(),
                    None => {
                        if queue.stop.load(Ordering::SeqCst) {
                            return;
                        }
                        ctx.process_completions(POLL_TIMEOUT);
                    }
                }
            }));
        }
    }

    fn stop(&self) {
        self.queue.stop.store(true, Ordering::SeqCst);
        // Wake every worker currently blocked in `process_completions` so it
        // re-checks `stop` instead of waiting out its full timeout.
        for _ in 0..self.max_concurrency.get() {
            self.ctx.wake();
        }
    }

    fn join(&self) {
        let mut threads = self.threads.lock().expect(ERR_POISONED_LOCK);
        for thread in threads.drain(..) {
            let _ = thread.join();
        }
    }

    fn is_started(&self) -> bool {
        !self.threads.lock().expect(ERR_POISONED_LOCK).is_empty()
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency.get()
    }
}
