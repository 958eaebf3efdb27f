// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ThreadWaker;

/// Wakes up whatever is waiting on the matching [`WakerWaiterFacade`].
///
/// Concrete I/O transports are out of scope here (see `dsk_sched::IoContextPool`
/// for the pluggable-transport story), so this currently only ever wraps a
/// condvar-backed [`ThreadWaker`] - kept as its own type rather than a bare
/// alias so a second backend can be added later without disturbing callers.
#[derive(Debug, Clone)]
pub struct WakerFacade(ThreadWaker);

impl From<ThreadWaker> for WakerFacade {
    fn from(waker: ThreadWaker) -> Self {
        Self(waker)
    }
}

impl WakerFacade {
    #[cfg_attr(test, mutants::skip)]
    pub fn notify(&self) {
        self.0.notify();
    }
}

/// Waits on the [`ThreadWaker`] a [`WakerFacade`] notifies.
#[derive(Debug)]
pub struct WakerWaiterFacade(ThreadWaker);

impl From<ThreadWaker> for WakerWaiterFacade {
    fn from(waker: ThreadWaker) -> Self {
        Self(waker)
    }
}

impl WakerWaiterFacade {
    #[cfg_attr(test, mutants::skip)]
    pub fn wait(&mut self, timeout: std::time::Duration) {
        self.0.wait(timeout);
    }

    /// True if nothing is currently pending on this waiter - always true for
    /// the condvar-backed waker, which has no notion of outstanding work of
    /// its own.
    #[cfg_attr(test, mutants::skip)]
    pub const fn is_inert(&self) -> bool {
        true
    }
}
