// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dsk_core::{AsyncContext, DeferredOp, ErrorKind};

const ERR_POISONED_LOCK: &str = "lock poisoned by a prior panic while holding it";

/// What a blocked producer's `enqueue` resolves to.
enum ProducerWake<T> {
    Accepted,
    Aborted(T, ErrorKind),
}

/// What a blocked consumer's `dequeue` resolves to.
enum ConsumerWake<T> {
    Value(T),
    EndReached,
    Canceled,
}

struct QueueState<T> {
    capacity: usize,
    items: VecDeque<T>,
    ended: bool,
    producer_waiters: VecDeque<Option<(T, oneshot::Sender<ProducerWake<T>>)>>,
    consumer_waiters: VecDeque<Option<oneshot::Sender<ConsumerWake<T>>>>,
}

#[derive(Default)]
struct Stats {
    total_enqueues: AtomicUsize,
    total_dequeues: AtomicUsize,
    enqueue_waits: AtomicUsize,
    dequeue_waits: AtomicUsize,
}

/// A bounded many-producer/many-consumer FIFO with an end-mark.
///
/// Invariant, checked under the lock in debug builds: at any quiescent
/// state, either `items` is non-empty and `consumer_waiters` is empty, or
/// `items` is empty and `producer_waiters` is empty, or both queues are
/// empty. A value handed from a blocked producer directly to a blocked
/// consumer (or vice versa) never touches `items` at all.
pub struct ResQueue<T> {
    state: Mutex<QueueState<T>>,
    stats: Stats,
}

impl<T: Send + 'static> ResQueue<T> {
    /// Builds an empty queue with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                capacity,
                items: VecDeque::new(),
                ended: false,
                producer_waiters: VecDeque::new(),
                consumer_waiters: VecDeque::new(),
            }),
            stats: Stats::default(),
        })
    }

    fn check_invariant(state: &QueueState<T>) {
        let live_consumers = state.consumer_waiters.iter().any(Option::is_some);
        debug_assert!(
            !(!state.items.is_empty() && live_consumers),
            "non-empty queue must not have a live consumer waiter"
        );
    }

    /// Non-blocking enqueue. On failure, hands `v` back alongside the
    /// reason: [`ErrorKind::EndReached`] once [`mark_end`](Self::mark_end)
    /// has been called, or [`ErrorKind::OutOfCapacity`] if the queue is
    /// full and no consumer is waiting.
    pub fn try_enqueue(&self, v: T) -> Result<(), (T, ErrorKind)> {
        self.stats.total_enqueues.fetch_add(1, Ordering::Relaxed);
        let state = self.state.lock().expect(ERR_POISONED_LOCK);
        self.try_enqueue_locked(state, v)
    }

    fn try_enqueue_locked(
        &self,
        mut state: MutexGuard<'_, QueueState<T>>,
        v: T,
    ) -> Result<(), (T, ErrorKind)> {
        if state.ended {
            return Err((v, ErrorKind::EndReached));
        }

        while matches!(state.consumer_waiters.front(), Some(None)) {
            state.consumer_waiters.pop_front();
        }

        if let Some(sender) = state.consumer_waiters.pop_front().flatten() {
            Self::check_invariant(&state);
            drop(state);
            // A failed send means the consumer canceled in the race window
            // between us popping it and sending - nobody else received
            // this value, so fall through and store it normally.
            return match sender.send(ConsumerWake::Value(v)) {
                Ok(()) => Ok(()),
                Err(ConsumerWake::Value(v)) => {
                    let state = self.state.lock().expect(ERR_POISONED_LOCK);
                    self.try_enqueue_locked(state, v)
                }
                Err(_) => unreachable!("only Value is ever sent here"),
            };
        }

        if state.items.len() < state.capacity {
            state.items.push_back(v);
            Self::check_invariant(&state);
            Ok(())
        } else {
            Err((v, ErrorKind::OutOfCapacity))
        }
    }

    /// Async enqueue: on contention, blocks the producer in the producer
    /// waiter FIFO, holding `v` itself, until space (or a direct consumer
    /// handoff) frees up, the queue is end-marked, or the context is
    /// stopped.
    pub fn enqueue(self: &Arc<Self>, v: T) -> DeferredOp<Result<(), ErrorKind>> {
        let queue = Arc::clone(self);

        DeferredOp::new(move |ctx: AsyncContext| async move {
            if ctx.stop_requested() {
                return Err(ErrorKind::Canceled);
            }

            let v = match queue.try_enqueue(v) {
                Ok(()) => return Ok(()),
                Err((_, ErrorKind::EndReached)) => return Err(ErrorKind::EndReached),
                Err((v, ErrorKind::OutOfCapacity)) => v,
                Err((_, other)) => return Err(other),
            };

            queue.stats.enqueue_waits.fetch_add(1, Ordering::Relaxed);

            let (tx, rx) = oneshot::channel::<ProducerWake<T>>();
            let waiter_id = {
                let mut state = queue.state.lock().expect(ERR_POISONED_LOCK);
                state.producer_waiters.push_back(Some((v, tx)));
                state.producer_waiters.len() - 1
            };

            let cancel_queue = Arc::clone(&queue);
            ctx.on_stop(move || {
                let mut state = cancel_queue.state.lock().expect(ERR_POISONED_LOCK);
                if let Some(slot) = state.producer_waiters.get_mut(waiter_id) {
                    if let Some((value, sender)) = slot.take() {
                        drop(state);
                        let _ = sender.send(ProducerWake::Aborted(value, ErrorKind::Canceled));
                    }
                }
            });

            match rx.await {
                Ok(ProducerWake::Accepted) => Ok(()),
                Ok(ProducerWake::Aborted(_, reason)) => Err(reason),
                Err(_) => Err(ErrorKind::Canceled),
            }
        })
    }

    /// Bulk push. After insertion, hands as many of the newly pushed (or
    /// already queued) items as possible directly to waiting consumers.
    pub fn force_enqueue_range(&self, values: impl IntoIterator<Item = T>) {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        for v in values {
            state.items.push_back(v);
            self.stats.total_enqueues.fetch_add(1, Ordering::Relaxed);
        }

        loop {
            while matches!(state.consumer_waiters.front(), Some(None)) {
                state.consumer_waiters.pop_front();
            }
            if state.items.is_empty() || state.consumer_waiters.front().is_none() {
                break;
            }
            let sender = state
                .consumer_waiters
                .pop_front()
                .flatten()
                .expect("checked Some above");
            let value = state.items.pop_front().expect("checked non-empty above");
            drop(state);
            state = self.state.lock().expect(ERR_POISONED_LOCK);
            if let Err(ConsumerWake::Value(returned)) = sender.send(ConsumerWake::Value(value)) {
                state.items.push_front(returned);
            }
        }

        Self::check_invariant(&state);
    }

    /// Non-blocking dequeue. Fails with [`ErrorKind::EndReached`] only once
    /// the queue is both empty and end-marked; otherwise
    /// [`ErrorKind::ResourceUnavailable`] if simply empty.
    pub fn try_dequeue(&self) -> Result<T, ErrorKind> {
        self.stats.total_dequeues.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

        let Some(value) = state.items.pop_front() else {
            return if state.ended {
                Err(ErrorKind::EndReached)
            } else {
                Err(ErrorKind::ResourceUnavailable)
            };
        };

        self.admit_one_producer(&mut state);
        Self::check_invariant(&state);
        Ok(value)
    }

    /// Pops the oldest live producer waiter (if any), pushing its value
    /// into `items` on its behalf and waking it with `Accepted`.
    fn admit_one_producer(&self, state: &mut QueueState<T>) {
        while matches!(state.producer_waiters.front(), Some(None)) {
            state.producer_waiters.pop_front();
        }

        if let Some((value, sender)) = state.producer_waiters.pop_front().flatten() {
            state.items.push_back(value);
            // A failed send just means the producer canceled in the same
            // race window; its value is already safely queued either way.
            let _ = sender.send(ProducerWake::Accepted);
        }
    }

    /// Async dequeue: on an empty, not-yet-ended queue, blocks the consumer
    /// in the consumer waiter FIFO until a value (direct handoff or a
    /// vacated slot) arrives, the queue is end-marked, or the context is
    /// stopped.
    pub fn dequeue(self: &Arc<Self>) -> DeferredOp<Result<T, ErrorKind>> {
        let queue = Arc::clone(self);

        DeferredOp::new(move |ctx: AsyncContext| async move {
            if ctx.stop_requested() {
                return Err(ErrorKind::Canceled);
            }

            match queue.try_dequeue() {
                Ok(value) => return Ok(value),
                Err(ErrorKind::ResourceUnavailable) => {}
                Err(other) => return Err(other),
            }

            queue.stats.dequeue_waits.fetch_add(1, Ordering::Relaxed);

            let (tx, rx) = oneshot::channel::<ConsumerWake<T>>();
            let waiter_id = {
                let mut state = queue.state.lock().expect(ERR_POISONED_LOCK);
                state.consumer_waiters.push_back(Some(tx));
                state.consumer_waiters.len() - 1
            };

            let cancel_queue = Arc::clone(&queue);
            ctx.on_stop(move || {
                let mut state = cancel_queue.state.lock().expect(ERR_POISONED_LOCK);
                if let Some(slot) = state.consumer_waiters.get_mut(waiter_id) {
                    if let Some(sender) = slot.take() {
                        drop(state);
                        let _ = sender.send(ConsumerWake::Canceled);
                    }
                }
            });

            match rx.await {
                Ok(ConsumerWake::Value(v)) => Ok(v),
                Ok(ConsumerWake::EndReached) => Err(ErrorKind::EndReached),
                Ok(ConsumerWake::Canceled) | Err(_) => Err(ErrorKind::Canceled),
            }
        })
    }

    /// One-shot: wakes every pending consumer with
    /// [`ErrorKind::EndReached`] and every pending producer with its value
    /// handed back alongside [`ErrorKind::EndReached`]. All subsequent
    /// `enqueue`/`try_enqueue` calls fail with [`ErrorKind::EndReached`];
    /// `dequeue`/`try_dequeue` keep draining `items` normally and only then
    /// start reporting `end_reached`.
    pub fn mark_end(&self) {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        if state.ended {
            return;
        }
        state.ended = true;

        let consumers: Vec<_> = state.consumer_waiters.drain(..).flatten().collect();
        let producers: Vec<_> = state.producer_waiters.drain(..).flatten().collect();
        drop(state);

        for sender in consumers {
            let _ = sender.send(ConsumerWake::EndReached);
        }
        for (value, sender) in producers {
            let _ = sender.send(ProducerWake::Aborted(value, ErrorKind::EndReached));
        }
    }

    /// Bulk consume. Checks the empty case first, same as [`dequeue`]
    /// (Self::dequeue): empty and end-marked reports
    /// [`ErrorKind::EndReached`], the same end-of-sequence signal a single
    /// `dequeue` would give, just checked once up front instead of per
    /// element. Empty and not end-marked returns an empty `Vec`. After
    /// draining, admits as many waiting producers as the now-free capacity
    /// allows.
    pub fn force_dequeue_all(&self) -> Result<Vec<T>, ErrorKind> {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

        if state.items.is_empty() && state.ended {
            return Err(ErrorKind::EndReached);
        }

        let drained: Vec<T> = state.items.drain(..).collect();
        self.stats
            .total_dequeues
            .fetch_add(drained.len(), Ordering::Relaxed);

        loop {
            let before = state.items.len();
            if before >= state.capacity {
                break;
            }
            self.admit_one_producer(&mut state);
            if state.items.len() == before {
                break;
            }
        }

        Self::check_invariant(&state);
        Ok(drained)
    }

    /// True once [`mark_end`](Self::mark_end) has been called.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state.lock().expect(ERR_POISONED_LOCK).ended
    }

    /// Total `enqueue`/`try_enqueue` attempts.
    #[must_use]
    pub fn total_enqueues(&self) -> usize {
        self.stats.total_enqueues.load(Ordering::Relaxed)
    }

    /// Total `dequeue`/`try_dequeue`/`force_dequeue_all` items consumed.
    #[must_use]
    pub fn total_dequeues(&self) -> usize {
        self.stats.total_dequeues.load(Ordering::Relaxed)
    }

    /// Number of `enqueue` calls that had to block.
    #[must_use]
    pub fn enqueue_waits(&self) -> usize {
        self.stats.enqueue_waits.load(Ordering::Relaxed)
    }

    /// Number of `dequeue` calls that had to block.
    #[must_use]
    pub fn dequeue_waits(&self) -> usize {
        self.stats.dequeue_waits.load(Ordering::Relaxed)
    }
}
