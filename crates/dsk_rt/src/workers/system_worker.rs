// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::RefCell;
use std::rc::Rc;

use threadpool::ThreadPool;
use tracing::warn;

use crate::once_event::shared::new_inefficient;
use crate::{RemoteJoinHandle, SystemTaskMeta};

/// Worker for system tasks. Meant to be created for each async worker thread to allow for scheduling of system tasks.
#[derive(Debug)]
pub struct SystemWorker {
    // Naive implementation using a per-async-worker thread pool
    pool: WorkerPool,
    is_shutting_down: RefCell<bool>,
}

impl SystemWorker {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            pool: WorkerPool::default(),
            is_shutting_down: RefCell::new(false),
        })
    }

    /// Submits a system task to the worker. If the worker is shutting down, the task will be ignored.
    pub fn spawn_system<F, R>(&self, _meta: SystemTaskMeta, body: F) -> RemoteJoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if *self.is_shutting_down.borrow() {
            return RemoteJoinHandle::new_never();
        }

        let (tx, rx) = new_inefficient();
        // We ignore meta for now
        self.pool.execute(|| {
            let result = body();
            tx.set(result);
        });

        if self.pool.is_overloaded() {
            self.pool.grow();
        }

        RemoteJoinHandle::new_unplaced(rx)
    }

    /// After shutting down, no new tasks will be accepted, but existing tasks will continue to run.
    pub fn shutdown(&self) {
        *self.is_shutting_down.borrow_mut() = true;
    }

    /// Waits for the currently running system tasks to complete.
    pub fn join(&self) {
        self.pool.join();
    }
}

#[derive(Debug)]
struct WorkerPool {
    pool: RefCell<ThreadPool>,
    max_thread_count: usize,
}

impl WorkerPool {
    /// Initial number of threads in the pool.
    /// It should be reasonable to start at one thread and ramp up the number if necessary.
    const INITIAL_THREAD_COUNT: usize = 1;

    /// Constant taken from similar use case in smol's [blocking}(https://github.com/smol-rs/blocking/blob/master/src/lib.rs) crate
    const MAX_TASKS_PER_THREAD: usize = 5;

    /// Maximum number of spawned threads. This number is currently more a guesstimate
    /// vaguely based on a default limits used by Tokio and Smol (512 threads globally).
    /// As the purpose of this thread pool is to run io bound tasks and not cpu bound tasks,
    /// higher thread number shouldn't significantly affect performance.
    /// For now, we set it to 64 threads, but this should be revisited in the future when we get some data from usage.
    const MAX_THREAD_COUNT_DEFAULT: usize = 64;
    fn new(initial_thread_count: usize, max_thread_count: usize) -> Self {
        Self {
            pool: RefCell::new(ThreadPool::new(initial_thread_count)),
            max_thread_count,
        }
    }

    fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.borrow().execute(f);
    }

    fn join(&self) {
        self.pool.borrow().join();
    }

    /// Grows the pool by one thread if possible
    fn grow(&self) {
        let mut pool = self.pool.borrow_mut();
        let new_thread_count = pool.max_count().saturating_add(1);

        if new_thread_count > self.max_thread_count {
            warn!(
                "System scheduler thread pool can't grow - it's overloaded and already at maximum permitted size"
            );
            return;
        }
        pool.set_num_threads(new_thread_count);
    }

    fn is_overloaded(&self) -> bool {
        let pool = self.pool.borrow();
        pool.active_count().saturating_add(pool.queued_count())
            > pool.max_count().saturating_mul(Self::MAX_TASKS_PER_THREAD)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(Self::INITIAL_THREAD_COUNT, Self::MAX_THREAD_COUNT_DEFAULT)
    }
}
