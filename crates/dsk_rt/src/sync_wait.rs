// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bridges between the [`dsk_core::AsyncOp`] protocol and both
//! non-coroutine (blocking) call sites and [`dsk_sched::Scheduler`]-backed
//! ones.

use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex};

use dsk_core::{
    make_async_ctx, AsyncContext, AsyncOp, Continuation, DeferredOp, Initiation, Resumer,
    SharedResumer,
};
use dsk_sched::{Scheduler, SchedulerResumer};

use crate::non_blocking_thread;
use crate::ERR_POISONED_LOCK;

struct CondvarState {
    done: Mutex<bool>,
    condvar: Condvar,
}

/// A one-shot [`Resumer`] that signals a local condition variable,
/// letting [`sync_wait`] block the calling thread rather than needing a
/// scheduler-backed destination of its own.
#[derive(Clone)]
struct CondvarResumer {
    state: Arc<CondvarState>,
}

impl std::fmt::Debug for CondvarResumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CondvarResumer").finish_non_exhaustive()
    }
}

impl CondvarResumer {
    fn new() -> Self {
        Self {
            state: Arc::new(CondvarState {
                done: Mutex::new(false),
                condvar: Condvar::new(),
            }),
        }
    }

    fn wait_for_completion(&self) {
        let mut done = self.state.done.lock().expect(ERR_POISONED_LOCK);
        while !*done {
            done = self.state.condvar.wait(done).expect(ERR_POISONED_LOCK);
        }
    }
}

impl Resumer for CondvarResumer {
    fn resume(&self, cont: Continuation) {
        cont.invoke();
        let mut done = self.state.done.lock().expect(ERR_POISONED_LOCK);
        *done = true;
        self.state.condvar.notify_one();
    }
}

/// Drives `op` to completion from non-coroutine code (`fn main`, a `#[test]`
/// body), blocking the calling thread. Tolerates `initiate` completing
/// synchronously without deadlocking on a condvar nobody will ever signal.
///
/// # Panics
///
/// Panics if called from a thread owned by this runtime - the same
/// constraint [`crate::RemoteJoinHandle::wait`] enforces, for the same
/// reason: blocking a worker thread can starve the pool it belongs to.
pub fn sync_wait<Op>(mut op: Op) -> Op::Output
where
    Op: AsyncOp,
{
    non_blocking_thread::assert_not_flagged();

    let resumer = CondvarResumer::new();
    let ctx = AsyncContext::none().with_resumer(Arc::new(resumer.clone()));

    let mut pinned = Pin::new(&mut op);
    let cont = Continuation::new(|| {});

    match pinned.as_mut().initiate(&ctx, cont) {
        Initiation::Completed => {}
        Initiation::WillComplete => resumer.wait_for_completion(),
    }

    pinned.as_mut().take_result()
}

/// Posts `op`'s own `initiate` call onto `scheduler` - and only that call;
/// every subsequent resume still happens wherever `op`'s own completion
/// mechanism (a waker, a different scheduler) arranges. Most callers want
/// [`run_on`] instead, which additionally routes every subsequent resume
/// through `scheduler` too.
pub fn start_on<Op, S>(scheduler: Arc<S>, op: Op) -> DeferredOp<Op::Output>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
    S: Scheduler + 'static,
{
    on_scheduler(scheduler, op, |ctx| ctx)
}

/// [`start_on`] plus substituting `scheduler`'s resumer for every suspension
/// inside `op`, via [`make_async_ctx`]. This is the form coroutine bodies
/// actually want: `op`'s first `initiate` happens on `scheduler`, and every
/// subsequent resume stays there too, rather than hopping back to whatever
/// thread happened to drive the first poll.
pub fn run_on<Op, S>(scheduler: Arc<S>, op: Op) -> DeferredOp<Op::Output>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
    S: Scheduler + 'static,
{
    let routing_scheduler = Arc::clone(&scheduler);
    on_scheduler(scheduler, op, move |ctx| {
        let resumer: SharedResumer = Arc::new(SchedulerResumer::new(routing_scheduler));
        make_async_ctx(&ctx).with_resumer(resumer)
    })
}

/// Shared plumbing for [`start_on`]/[`run_on`]: posts `op`'s `initiate` call
/// onto `scheduler`, with `route_ctx` deciding what context that `initiate`
/// call (and hence `op`'s own resumer, if it propagates the context it was
/// given) actually sees.
fn on_scheduler<Op, S, R>(scheduler: Arc<S>, op: Op, route_ctx: R) -> DeferredOp<Op::Output>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
    S: Scheduler + 'static,
    R: FnOnce(AsyncContext) -> AsyncContext + Send + 'static,
{
    DeferredOp::new(move |ctx: AsyncContext| async move {
        let op = Arc::new(Mutex::new(Box::pin(op)));
        let initiate_ctx = route_ctx(ctx);

        let (tx, rx) = oneshot::channel::<()>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let posted_op = Arc::clone(&op);
        let posted_ctx = initiate_ctx.clone();
        let send_tx = Arc::clone(&tx);
        scheduler.post(Continuation::new(move || {
            let mut guard = posted_op.lock().expect(ERR_POISONED_LOCK);

            let cont_tx = Arc::clone(&send_tx);
            let cont = Continuation::new(move || {
                if let Some(tx) = cont_tx.lock().expect(ERR_POISONED_LOCK).take() {
                    drop(tx.send(()));
                }
            });

            if let Initiation::Completed = guard.as_mut().initiate(&posted_ctx, cont) {
                if let Some(tx) = send_tx.lock().expect(ERR_POISONED_LOCK).take() {
                    drop(tx.send(()));
                }
            }
        }));

        rx.await
            .expect("scheduler dropped the posted job without running it");

        op.lock().expect(ERR_POISONED_LOCK).as_mut().take_result()
    })
}

/// One-shot "jump to `scheduler` for the next resume" op. Short-circuits to
/// [`Initiation::Completed`] when the calling context's resumer already
/// compares equal to `scheduler`'s (the resumer-equality optimization from
/// [`Resumer::same_destination`]), avoiding a redundant repost.
pub struct ResumeOn<S> {
    scheduler: Arc<S>,
}

impl<S> ResumeOn<S> {
    /// Builds a one-shot resume-on-`scheduler` op.
    pub const fn new(scheduler: Arc<S>) -> Self {
        Self { scheduler }
    }
}

impl<S> AsyncOp for ResumeOn<S>
where
    S: Scheduler + 'static,
{
    type Output = ();

    fn initiate(self: Pin<&mut Self>, ctx: &AsyncContext, cont: Continuation) -> Initiation {
        let target = SchedulerResumer::new(Arc::clone(&self.scheduler));

        if ctx.resumer().same_destination(&target) {
            return Initiation::Completed;
        }

        target.resume(cont);
        Initiation::WillComplete
    }

    fn take_result(self: Pin<&mut Self>) {}
}

/// Builds the one-shot resume-on op for `scheduler`.
pub fn resume_on<S>(scheduler: Arc<S>) -> ResumeOn<S>
where
    S: Scheduler + 'static,
{
    ResumeOn::new(scheduler)
}
