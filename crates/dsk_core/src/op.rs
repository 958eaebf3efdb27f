// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll, Waker};

use crate::context::AsyncContext;
use crate::continuation::Continuation;
use crate::resumer::SharedResumer;

const ERR_POISONED_LOCK: &str = "lock poisoned by a prior panic while holding it";

/// What happened when [`AsyncOp::initiate`] was called.
///
/// This is the Rust realization of the tri-state `void`/`bool`/
/// `coroutine_handle` convention some async-op protocols use for `initiate`:
/// Rust's `async` machinery has no symmetric-transfer tail-resume to model a
/// third arm, so it collapses to these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiation {
    /// The op finished synchronously; its continuation was not retained and
    /// will not be invoked - the caller should proceed as if resumed
    /// immediately.
    Completed,
    /// The op is pending; it has taken ownership of the continuation and
    /// will invoke it (through the context's resumer) once it completes.
    WillComplete,
}

/// The uniform async-operation protocol every coroutine, combinator, pool
/// acquisition, and queue operation in this workspace implements.
///
/// `initiate`/`take_result` mirror `.await`'s two phases (suspend, then
/// resume-and-extract) explicitly, which is what lets combinators drive
/// several operations side by side without actually awaiting each one in
/// turn.
pub trait AsyncOp {
    /// What this operation produces once it completes.
    type Output;

    /// True if this op is known to always complete synchronously,
    /// regardless of context - lets callers (notably `manual_initiate`)
    /// skip a continuation dance entirely.
    fn is_immediate(&self) -> bool {
        false
    }

    /// Starts the operation. On [`Initiation::WillComplete`], this op must
    /// eventually call `ctx.resumer().resume(cont)` from wherever the
    /// completion happens (another thread, a waker, a scheduler). On
    /// [`Initiation::Completed`], `cont` is dropped without being invoked
    /// and the result is already available via [`take_result`](Self::take_result).
    fn initiate(self: Pin<&mut Self>, ctx: &AsyncContext, cont: Continuation) -> Initiation;

    /// True if the completed op represents a failure. Pools/queues/
    /// combinators use this to decide fan-in semantics without forcing
    /// every `Output` to be a `Result`.
    fn is_failed(&self) -> bool {
        false
    }

    /// Extracts the result. Must be called exactly once, after completion
    /// has been observed (either `Completed` was returned, or the
    /// continuation handed to `initiate` ran).
    fn take_result(self: Pin<&mut Self>) -> Self::Output;
}

/// Drives `op` to completion from outside a coroutine - the call made when
/// an [`AsyncOp`] is not reached via `.await` (e.g. a combinator driving
/// several children, or a sync-wait driver built atop this crate). Resumes
/// through `ctx`'s resumer rather than invoking `cont` directly, so
/// scheduler-backed resumers still get a chance to hop threads.
///
/// `cont` may be invoked by `op` before this function returns, which may in
/// turn drop resources reachable only through `op` - callers must not touch
/// such resources afterward.
pub fn manual_initiate<Op>(mut op: Pin<&mut Op>, ctx: &AsyncContext, cont: Continuation)
where
    Op: AsyncOp + ?Sized,
{
    if op.as_mut().is_immediate() {
        ctx.resumer().resume(cont);
        return;
    }

    let _ = op.as_mut().initiate(ctx, cont);
}

/// Type-erased [`AsyncOp`], for call sites (combinators over a
/// caller-supplied `Vec` of differently-typed ops) that genuinely need
/// heterogeneous collections. Prefer the generic, statically dispatched
/// form everywhere else.
pub type BoxedOp<Output> = Pin<Box<dyn AsyncOp<Output = Output> + Send>>;

/// Drives `op` to completion from plain `async`/`.await` code, the mirror
/// image of [`FutureOp`] (which goes the other way: future-as-op). Every
/// coroutine body, combinator, and pool/queue op in this workspace is
/// written as an ordinary `async fn` internally and needs this to await an
/// arbitrary [`AsyncOp`] - there being no language-level `.await` support
/// for the `initiate`/`take_result` protocol directly.
///
/// `ctx` is consumed for the duration of the wait; callers that need it
/// afterward should clone before calling this.
pub async fn op_as_future<Op>(op: Op, ctx: AsyncContext) -> Op::Output
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    let mut op = Box::pin(op);

    if op.as_mut().is_immediate() {
        return op.as_mut().take_result();
    }

    let (tx, rx) = oneshot::channel::<()>();
    let cont = Continuation::new(move || {
        // The receiver may already be gone if the awaiting future was
        // dropped (e.g. canceled mid-wait); there is nothing to resume in
        // that case, so a failed send is not an error.
        drop(tx.send(()));
    });

    match op.as_mut().initiate(&ctx, cont) {
        Initiation::Completed => {}
        Initiation::WillComplete => {
            // The sender is only ever dropped after sending, so a recv
            // error here would mean `initiate` broke its contract.
            rx.await.expect("op dropped its continuation without invoking it");
        }
    }

    op.as_mut().take_result()
}

/// `.into_future(ctx)` sugar for [`op_as_future`], so call sites can write
/// `op.into_future(ctx).await` instead of the free-function form.
pub trait AsyncOpExt: AsyncOp + Sized {
    /// See [`op_as_future`].
    fn into_future(
        self,
        ctx: AsyncContext,
    ) -> impl Future<Output = Self::Output> + Send
    where
        Self: Send + 'static,
        Self::Output: Send + 'static,
    {
        op_as_future(self, ctx)
    }
}

impl<Op: AsyncOp> AsyncOpExt for Op {}

enum DeferredState<T> {
    Pending(Box<dyn FnOnce(AsyncContext) -> futures::future::BoxFuture<'static, T> + Send>),
    Started(FutureOp<futures::future::BoxFuture<'static, T>>),
}

/// An [`AsyncOp`] whose underlying future is only built once its context is
/// known, i.e. at [`initiate`](AsyncOp::initiate) time rather than
/// construction time.
///
/// Combinators, pool acquisitions, and queue ops all need this: they are
/// built from a context-dependent recipe ("race this op against a timer
/// derived from `ctx`'s clock", "register a stop-callback on `ctx`'s stop
/// source") that cannot be evaluated any earlier than `initiate`.
pub struct DeferredOp<T> {
    state: Mutex<Option<DeferredState<T>>>,
}

impl<T: Send + 'static> DeferredOp<T> {
    /// Builds a deferred op from a factory that receives the context it was
    /// ultimately initiated with.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: FnOnce(AsyncContext) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            state: Mutex::new(Some(DeferredState::Pending(Box::new(move |ctx| {
                Box::pin(factory(ctx))
            })))),
        }
    }
}

impl<T: Send + 'static> AsyncOp for DeferredOp<T> {
    type Output = T;

    fn initiate(self: Pin<&mut Self>, ctx: &AsyncContext, cont: Continuation) -> Initiation {
        let this = self.get_mut();
        let mut guard = this.state.lock().expect(ERR_POISONED_LOCK);

        let factory = match guard.take() {
            Some(DeferredState::Pending(factory)) => factory,
            _ => panic!("DeferredOp initiated more than once"),
        };

        let mut driver = FutureOp::new(factory(ctx.clone()));
        let initiation = Pin::new(&mut driver).initiate(ctx, cont);
        *guard = Some(DeferredState::Started(driver));
        initiation
    }

    fn take_result(self: Pin<&mut Self>) -> T {
        let this = self.get_mut();
        let mut guard = this.state.lock().expect(ERR_POISONED_LOCK);

        match guard.as_mut() {
            Some(DeferredState::Started(driver)) => Pin::new(driver).take_result(),
            _ => panic!("take_result called before initiate completed"),
        }
    }
}

struct Inner<F: Future> {
    fut: F,
    result: Option<F::Output>,
    pending: Option<(SharedResumer, Continuation)>,
}

/// Adapts an ordinary [`Future`] into an [`AsyncOp`], so any `async fn` body
/// composes with combinators, pools, and queues without a parallel
/// Future-vs-AsyncOp hierarchy.
///
/// The future is driven entirely through its own wakers (one poll per wake,
/// same as any other executor) - [`AsyncOp::initiate`] only performs the
/// *first* poll; subsequent polls happen internally as the future's own
/// wakeups arrive, and the op's continuation fires only once the future is
/// truly [`Poll::Ready`].
pub struct FutureOp<F: Future> {
    inner: Arc<Mutex<Inner<F>>>,
}

impl<F: Future> FutureOp<F> {
    /// Wraps `fut` as an [`AsyncOp`].
    pub fn new(fut: F) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                fut,
                result: None,
                pending: None,
            })),
        }
    }
}

struct DriverWaker<F: Future> {
    inner: Arc<Mutex<Inner<F>>>,
}

impl<F> std::task::Wake for DriverWaker<F>
where
    F: Future + Send + 'static,
    F::Output: Send,
{
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        let waker: Waker = Waker::from(Arc::clone(self));
        let mut task_cx = TaskContext::from_waker(&waker);

        let outcome = {
            let mut guard = self.inner.lock().expect(ERR_POISONED_LOCK);

            if guard.result.is_some() {
                return; // already completed by a racing wake; nothing to do.
            }

            // SAFETY: `fut` lives inside the `Arc`-owned `Inner`, whose
            // address never changes for as long as any clone of `inner`
            // exists, and is never moved out of.
            let fut = unsafe { Pin::new_unchecked(&mut guard.fut) };

            match fut.poll(&mut task_cx) {
                Poll::Ready(value) => {
                    guard.result = Some(value);
                    guard.pending.take()
                }
                Poll::Pending => None,
            }
        };

        if let Some((resumer, cont)) = outcome {
            resumer.resume(cont);
        }
    }
}

impl<F> AsyncOp for FutureOp<F>
where
    F: Future + Send + 'static,
    F::Output: Send,
{
    type Output = F::Output;

    fn initiate(self: Pin<&mut Self>, ctx: &AsyncContext, cont: Continuation) -> Initiation {
        let waker: Waker = Waker::from(Arc::new(DriverWaker {
            inner: Arc::clone(&self.inner),
        }));
        let mut task_cx = TaskContext::from_waker(&waker);

        let mut guard = self.inner.lock().expect(ERR_POISONED_LOCK);
        debug_assert!(guard.pending.is_none(), "initiate called more than once");

        // SAFETY: see `DriverWaker::wake_by_ref`.
        let fut = unsafe { Pin::new_unchecked(&mut guard.fut) };

        match fut.poll(&mut task_cx) {
            Poll::Ready(value) => {
                guard.result = Some(value);
                Initiation::Completed
            }
            Poll::Pending => {
                guard.pending = Some((Arc::clone(ctx.resumer()), cont));
                Initiation::WillComplete
            }
        }
    }

    fn take_result(self: Pin<&mut Self>) -> Self::Output {
        self.inner
            .lock()
            .expect(ERR_POISONED_LOCK)
            .result
            .take()
            .expect("take_result called before completion was observed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::pin;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn immediate_future_completes_synchronously() {
        let op = FutureOp::new(async { 42 });
        let mut pinned = pin!(op);

        let ctx = AsyncContext::none();
        let initiation = pinned
            .as_mut()
            .initiate(&ctx, Continuation::new(|| panic!("should not be invoked")));

        assert_eq!(initiation, Initiation::Completed);
        assert_eq!(pinned.as_mut().take_result(), 42);
    }

    #[tokio::test]
    async fn pending_future_resumes_once_truly_ready() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let op = FutureOp::new(async move {
            rx.await.unwrap();
            7
        });

        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);

        let mut pinned = pin!(op);
        let ctx = AsyncContext::none();
        let initiation = pinned.as_mut().initiate(
            &ctx,
            Continuation::new(move || ran2.store(true, Ordering::SeqCst)),
        );
        assert_eq!(initiation, Initiation::WillComplete);
        assert!(!ran.load(Ordering::SeqCst));

        tx.send(()).unwrap();

        for _ in 0..50 {
            if ran.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(pinned.as_mut().take_result(), 7);
    }

    #[tokio::test]
    async fn op_as_future_resolves_immediate_op() {
        let op = FutureOp::new(async { 9 });
        let output = op_as_future(op, AsyncContext::none()).await;
        assert_eq!(output, 9);
    }

    #[tokio::test]
    async fn op_as_future_resolves_pending_op() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let op = FutureOp::new(async move {
            rx.await.unwrap();
            5
        });

        let handle = tokio::spawn(op_as_future(op, AsyncContext::none()));
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        tx.send(()).unwrap();

        assert_eq!(handle.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn into_future_sugar_matches_free_function() {
        let op = FutureOp::new(async { "ok" });
        assert_eq!(op.into_future(AsyncContext::none()).await, "ok");
    }

    #[tokio::test]
    async fn deferred_op_builds_future_from_initiate_time_context() {
        let source = crate::context::StopSource::new();
        let ctx = AsyncContext::none().with_stop_token(source.token());

        let deferred = DeferredOp::new(|ctx: AsyncContext| async move { ctx.stop_possible() });

        assert!(deferred.into_future(ctx).await);
    }

    #[test]
    #[should_panic(expected = "initiated more than once")]
    fn deferred_op_panics_if_initiated_twice() {
        let op = DeferredOp::new(|_ctx| async { 1 });
        let mut pinned = pin!(op);
        let ctx = AsyncContext::none();

        let _ = pinned
            .as_mut()
            .initiate(&ctx, Continuation::new(|| {}));
        let _ = pinned
            .as_mut()
            .initiate(&ctx, Continuation::new(|| {}));
    }
}
