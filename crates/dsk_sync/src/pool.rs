// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use dsk_core::{AsyncContext, DeferredOp, ErrorKind};

const ERR_POISONED_LOCK: &str = "lock poisoned by a prior panic while holding it";

/// What a released resource, or a waiter's cancellation, resolves to.
enum Grant<T> {
    Resource(T),
    Canceled,
}

struct PoolState<T> {
    capacity: usize,
    unused: VecDeque<T>,
    in_use: usize,
    waiters: VecDeque<Option<oneshot::Sender<Grant<T>>>>,
}

/// A bounded collection of resources with lazy creation and FIFO-fair
/// handoff to waiters.
///
/// Invariant: `in_use + unused.len() <= capacity` at all times. Waiters are
/// only ever queued once that sum has reached `capacity`; releasing a
/// resource hands it directly to the oldest live (non-canceled) waiter
/// before it is ever returned to `unused`.
pub struct ResPool<T> {
    state: Mutex<PoolState<T>>,
    creator: Box<dyn Fn() -> T + Send + Sync>,
    recycler: Option<Box<dyn Fn(&mut T) + Send + Sync>>,
}

impl<T: Send + 'static> ResPool<T> {
    /// Builds a pool of `capacity` resources, created lazily via `creator`.
    pub fn new(capacity: usize, creator: impl Fn() -> T + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PoolState {
                capacity,
                unused: VecDeque::new(),
                in_use: 0,
                waiters: VecDeque::new(),
            }),
            creator: Box::new(creator),
            recycler: None,
        })
    }

    /// Builds a pool that additionally resets each resource via `recycler`
    /// when a handle is returned.
    pub fn with_recycler(
        capacity: usize,
        creator: impl Fn() -> T + Send + Sync + 'static,
        recycler: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PoolState {
                capacity,
                unused: VecDeque::new(),
                in_use: 0,
                waiters: VecDeque::new(),
            }),
            creator: Box::new(creator),
            recycler: Some(Box::new(recycler)),
        })
    }

    /// Non-blocking acquire. Grows the pool lazily (creating a fresh `T`) if
    /// there is room under capacity; otherwise fails immediately rather than
    /// queuing a waiter.
    pub fn try_acquire(self: &Arc<Self>) -> Result<PoolHandle<T>, ErrorKind> {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

        if let Some(item) = state.unused.pop_front() {
            state.in_use += 1;
            drop(state);
            return Ok(PoolHandle::new(Arc::clone(self), item));
        }

        if state.in_use + state.unused.len() < state.capacity {
            let item = (self.creator)();
            state.in_use += 1;
            drop(state);
            return Ok(PoolHandle::new(Arc::clone(self), item));
        }

        Err(ErrorKind::ResourceUnavailable)
    }

    /// Async acquire: tries the non-blocking path first; on contention,
    /// enqueues a waiter and suspends until a release hands it a resource
    /// directly, or the context is stopped.
    pub fn acquire(self: &Arc<Self>) -> DeferredOp<Result<PoolHandle<T>, ErrorKind>> {
        let pool = Arc::clone(self);

        DeferredOp::new(move |ctx: AsyncContext| async move {
            if ctx.stop_requested() {
                return Err(ErrorKind::Canceled);
            }

            match pool.try_acquire() {
                Ok(handle) => return Ok(handle),
                Err(ErrorKind::ResourceUnavailable) => {}
                Err(other) => return Err(other),
            }

            let (tx, rx) = oneshot::channel::<Grant<T>>();
            let waiter_id = {
                let mut state = pool.state.lock().expect(ERR_POISONED_LOCK);
                state.waiters.push_back(Some(tx));
                state.waiters.len() - 1
            };

            let cancel_pool = Arc::clone(&pool);
            ctx.on_stop(move || {
                let mut state = cancel_pool.state.lock().expect(ERR_POISONED_LOCK);
                if let Some(slot) = state.waiters.get_mut(waiter_id) {
                    if let Some(sender) = slot.take() {
                        drop(state);
                        let _ = sender.send(Grant::Canceled);
                    }
                }
            });

            match rx.await {
                Ok(Grant::Resource(item)) => Ok(PoolHandle::new(Arc::clone(&pool), item)),
                Ok(Grant::Canceled) | Err(_) => Err(ErrorKind::Canceled),
            }
        })
    }

    /// Sets a new capacity. Does not evict resources already in use or
    /// unused; only changes how much further growth [`try_acquire`](Self::try_acquire)
    /// and [`acquire`](Self::acquire) are willing to do.
    pub fn set_capacity(&self, capacity: usize) {
        self.state.lock().expect(ERR_POISONED_LOCK).capacity = capacity;
    }

    /// The current configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().expect(ERR_POISONED_LOCK).capacity
    }

    /// Grows capacity by `additional`.
    pub fn reserve(&self, additional: usize) {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        state.capacity += additional;
    }

    /// Grows capacity by a `ratio` (e.g. `1.5` for +50%), capped at `max`.
    /// Never shrinks capacity.
    pub fn reserve_by(&self, ratio: f64, max: usize) {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        let target = ((state.capacity as f64) * ratio).ceil() as usize;
        state.capacity = target.clamp(state.capacity, max);
    }

    fn release(&self, mut item: T) {
        if let Some(recycler) = &self.recycler {
            recycler(&mut item);
        }

        loop {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

            while matches!(state.waiters.front(), Some(None)) {
                state.waiters.pop_front();
            }

            let Some(sender) = state.waiters.pop_front().flatten() else {
                state.in_use -= 1;
                state.unused.push_back(item);
                return;
            };

            drop(state);

            match sender.send(Grant::Resource(item)) {
                Ok(()) => return,
                // The waiter canceled in the narrow window between us
                // popping it and sending - nobody else was handed this
                // resource in the meantime, so try the next waiter (or
                // finally return it to `unused`).
                Err(Grant::Resource(returned)) => item = returned,
                Err(Grant::Canceled) => unreachable!("never sent by release"),
            }
        }
    }
}

/// A keyed collection of [`ResPool`]s, each created lazily on first use with
/// a shared default creator/recycler.
pub struct ResPoolMap<K, T> {
    capacity_per_key: usize,
    creator: Arc<dyn Fn() -> T + Send + Sync>,
    recycler: Option<Arc<dyn Fn(&mut T) + Send + Sync>>,
    pools: Mutex<HashMap<K, Arc<ResPool<T>>>>,
}

impl<K, T> ResPoolMap<K, T>
where
    K: Eq + Hash + Clone,
    T: Send + 'static,
{
    /// Builds a pool map where each sub-pool has `capacity_per_key` slots.
    pub fn new(
        capacity_per_key: usize,
        creator: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            capacity_per_key,
            creator: Arc::new(creator),
            recycler: None,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a pool map whose sub-pools additionally recycle resources via
    /// `recycler`.
    pub fn with_recycler(
        capacity_per_key: usize,
        creator: impl Fn() -> T + Send + Sync + 'static,
        recycler: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            capacity_per_key,
            creator: Arc::new(creator),
            recycler: Some(Arc::new(recycler)),
            pools: Mutex::new(HashMap::new()),
        }
    }

    fn sub_pool(&self, key: &K) -> Arc<ResPool<T>> {
        let mut pools = self.pools.lock().expect(ERR_POISONED_LOCK);

        if let Some(pool) = pools.get(key) {
            return Arc::clone(pool);
        }

        let capacity = self.capacity_per_key;
        let creator = Arc::clone(&self.creator);
        let pool = match &self.recycler {
            Some(recycler) => {
                let recycler = Arc::clone(recycler);
                ResPool::with_recycler(capacity, move || creator(), move |item| recycler(item))
            }
            None => ResPool::new(capacity, move || creator()),
        };

        pools.insert(key.clone(), Arc::clone(&pool));
        pool
    }

    /// Non-blocking acquire from the sub-pool for `key`, creating that
    /// sub-pool on first use.
    pub fn try_acquire(&self, key: &K) -> Result<PoolHandle<T>, ErrorKind> {
        self.sub_pool(key).try_acquire()
    }

    /// Async acquire from the sub-pool for `key`, creating that sub-pool on
    /// first use.
    pub fn acquire(&self, key: &K) -> DeferredOp<Result<PoolHandle<T>, ErrorKind>> {
        self.sub_pool(key).acquire()
    }
}

/// Move-only RAII guard for a pooled resource. Dropping it (or an explicit
/// [`release`](Self::release)) recycles the resource and hands it to the
/// oldest waiter, if any, before it is returned to the pool's unused list.
pub struct PoolHandle<T> {
    pool: Arc<ResPool<T>>,
    item: Option<T>,
}

impl<T: Send + 'static> PoolHandle<T> {
    fn new(pool: Arc<ResPool<T>>, item: T) -> Self {
        Self {
            pool,
            item: Some(item),
        }
    }

    /// Recycles the resource back to the pool now, rather than waiting for
    /// `Drop`.
    pub fn release(mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

impl<T> std::ops::Deref for PoolHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("item taken only on release/drop")
    }
}

impl<T> std::ops::DerefMut for PoolHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("item taken only on release/drop")
    }
}

impl<T: Send + 'static> Drop for PoolHandle<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}
