// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;

use dsk_core::{Continuation, Resumer};

/// Something that can accept work and run it, somewhere, eventually.
///
/// Every scheduler in this crate follows the same lifecycle:
/// `start` → any number of `post`s → `stop` → `join`, optionally repeated
/// via `restart`. `post` is only legal once `start` has returned; callers
/// that violate this get a debug-mode panic rather than silently dropped
/// work, matching `dsk_rt`'s posture of panicking on contract violations
/// rather than returning an error type nobody checks.
pub trait Scheduler: fmt::Debug + Send + Sync {
    /// Enqueues `job` to run on one of this scheduler's worker threads.
    ///
    /// # Panics
    ///
    /// May panic (debug builds only) if called before [`start`](Self::start)
    /// or after [`stop`](Self::stop).
    fn post(&self, job: Continuation);

    /// Spins up this scheduler's worker threads. Must not be called twice
    /// without an intervening [`join`](Self::join).
    fn start(&self);

    /// Signals worker threads to stop picking up new work. Already-running
    /// jobs finish; jobs still queued may or may not run, depending on the
    /// scheduler. Safe to call more than once.
    fn stop(&self);

    /// Waits for every worker thread to exit. `stop` must have been called
    /// first (directly or via [`stop_and_join`](Self::stop_and_join)) or
    /// this blocks forever. Safe to call more than once.
    fn join(&self);

    /// True once [`start`](Self::start) has run and [`join`](Self::join)
    /// has not yet completed.
    fn is_started(&self) -> bool;

    /// The number of worker threads this scheduler runs.
    fn max_concurrency(&self) -> usize;

    /// Convenience for `stop(); join();`.
    fn stop_and_join(&self) {
        self.stop();
        self.join();
    }

    /// Convenience for `stop_and_join(); start();`.
    fn restart(&self) {
        self.stop_and_join();
        self.start();
    }
}

/// Adapts any [`Scheduler`] into a [`Resumer`] that posts the continuation
/// back onto that scheduler. Two `SchedulerResumer`s sharing the same
/// underlying scheduler compare as the same destination, which is what
/// lets a coroutine skip a redundant hop when it is already running on the
/// scheduler it would resume to.
#[derive(Debug, Clone)]
pub struct SchedulerResumer<S> {
    scheduler: Arc<S>,
}

impl<S> SchedulerResumer<S> {
    /// Wraps `scheduler` as a resumer.
    pub const fn new(scheduler: Arc<S>) -> Self {
        Self { scheduler }
    }
}

impl<S> Resumer for SchedulerResumer<S>
where
    S: Scheduler + 'static,
{
    fn resume(&self, cont: Continuation) {
        self.scheduler.post(cont);
    }

    fn same_destination(&self, other: &dyn Resumer) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|peer| Arc::ptr_eq(&self.scheduler, &peer.scheduler))
    }
}
