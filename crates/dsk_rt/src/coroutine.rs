// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `Task<R>`/`Generator<T>`: the coroutine-shaped [`AsyncOp`]s everything
//! else in this workspace ultimately composes. A `Task` is a spawned
//! `Future<Output = Expected<R>>` paired with the [`CleanupScope`] its body
//! ran against; a `Generator` is a `Task<()>` whose body hands values to a
//! [`Yielder`] instead of returning one.

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use dsk_core::{
    cleanup, AsyncContext, AsyncOp, CleanupScope, Continuation, Expected, FutureOp, Initiation,
};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::ERR_POISONED_LOCK;

/// Pushes a task's scope onto this thread's [`cleanup`] stack before every
/// poll of its body and pops it after, so `add_parent_cleanup` called
/// synchronously from within a task's body sees the right enclosing scope.
struct ScopedBody<T> {
    inner: BoxFuture<'static, T>,
    scope: Arc<CleanupScope>,
}

impl<T> Future for ScopedBody<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        cleanup::push_scope(&this.scope);
        let result = this.inner.as_mut().poll(cx);
        cleanup::pop_scope();
        result
    }
}

/// A spawned coroutine body, captured as a boxed/pinned
/// `Future<Output = Expected<R>>` plus the [`CleanupScope`] it ran against.
///
/// `Task` is itself an [`AsyncOp`] - combinators, pools, and `sync_wait`/
/// `run_on` all drive it exactly like any other op, with no separate
/// "coroutine" hierarchy. Every registered cleanup op runs, in reverse
/// registration order, against an uncancelable context derived from the one
/// the task was spawned with, once the body returns - regardless of whether
/// the body succeeded, failed, or was canceled partway through.
///
/// Cleanup ops are held behind an `Arc` rather than the `Rc` a purely
/// single-threaded coroutine object would use: `Task` is driven by
/// [`FutureOp`]'s own waker, which may fire from any worker thread, so the
/// scope it shares with the body needs to tolerate that even when the task
/// itself never leaves the thread it was spawned on.
pub struct Task<R>
where
    R: Send + 'static,
{
    inner: FutureOp<BoxFuture<'static, Expected<R>>>,
    cleanup: Arc<CleanupScope>,
}

impl<R> Task<R>
where
    R: Send + 'static,
{
    /// Spawns `body`, which receives the context it was spawned with and a
    /// handle to its cleanup scope.
    pub fn spawn<F, Fut>(ctx: AsyncContext, body: F) -> Self
    where
        F: FnOnce(AsyncContext, Arc<CleanupScope>) -> Fut + Send + 'static,
        Fut: Future<Output = Expected<R>> + Send + 'static,
    {
        let cleanup = Arc::new(CleanupScope::new());
        let run_ctx = ctx.clone();
        let scope_for_body = Arc::clone(&cleanup);
        let scope_for_drain = Arc::clone(&cleanup);

        let fut: BoxFuture<'static, Expected<R>> = async move {
            let outcome = body(run_ctx.clone(), scope_for_body).await;
            let uncancelable = run_ctx.without_cancellation();
            let cleanup_outcome = scope_for_drain.run_all(&uncancelable).await;

            match (outcome, cleanup_outcome) {
                (Err(err), _) => Err(err),
                (Ok(_), Err(err)) => Err(err),
                (Ok(value), Ok(())) => Ok(value),
            }
        }
        .boxed();

        let scoped: BoxFuture<'static, Expected<R>> = Box::pin(ScopedBody {
            inner: fut,
            scope: Arc::clone(&cleanup),
        });

        Self {
            inner: FutureOp::new(scoped),
            cleanup,
        }
    }

    /// The cleanup scope the spawned body runs against - exposed so callers
    /// (notably tests) can register additional cleanup ops before the body
    /// observably completes, or inspect how many are still pending.
    #[must_use]
    pub fn cleanup_scope(&self) -> &Arc<CleanupScope> {
        &self.cleanup
    }
}

impl<R> AsyncOp for Task<R>
where
    R: Send + 'static,
{
    type Output = Expected<R>;

    fn initiate(self: Pin<&mut Self>, ctx: &AsyncContext, cont: Continuation) -> Initiation {
        let this = self.get_mut();
        Pin::new(&mut this.inner).initiate(ctx, cont)
    }

    fn take_result(self: Pin<&mut Self>) -> Self::Output {
        let this = self.get_mut();
        Pin::new(&mut this.inner).take_result()
    }
}

/// The producer-side handle a [`Generator`] body uses to hand values to its
/// consumer, one at a time.
pub struct Yielder<T> {
    values: async_channel::Sender<T>,
}

impl<T> Yielder<T>
where
    T: Send + 'static,
{
    /// Hands `value` to the generator's consumer, waiting until there is
    /// room for it (bounded by the generator's `capacity`). Resolves
    /// immediately, without delivering anything, if the consumer has already
    /// dropped the generator - a yielding body is expected to check for this
    /// via its own cancellation plumbing, not via this method's return type.
    pub async fn yield_value(&self, value: T) {
        drop(self.values.send(value).await);
    }
}

/// A `Task<()>`-shaped coroutine that hands values to its consumer through
/// [`Yielder::yield_value`] instead of returning a single result.
///
/// Built the same way `dsk_rt`'s join handles pair a producer with a
/// consumer over a channel: spawning starts the body running immediately
/// (driven by [`Task`]'s own waker, exactly as any other spawned task is),
/// and [`next`](Self::next) is a plain consumer-side [`AsyncOp`] over a
/// bounded channel.
pub struct Generator<T>
where
    T: Send + 'static,
{
    values: async_channel::Receiver<T>,
    result: Arc<Mutex<Option<Expected<()>>>>,
}

impl<T> Generator<T>
where
    T: Send + 'static,
{
    /// Spawns `body` against a channel of the given `capacity`, immediately
    /// starting it (rather than waiting for the first [`next`](Self::next)
    /// call) so the body can run ahead of its consumer up to `capacity`
    /// buffered values.
    pub fn spawn<F, Fut>(ctx: AsyncContext, capacity: NonZeroUsize, body: F) -> Self
    where
        F: FnOnce(AsyncContext, Arc<CleanupScope>, Yielder<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Expected<()>> + Send + 'static,
    {
        let (tx, rx) = async_channel::bounded(capacity.get());
        let yielder = Yielder { values: tx };

        let task = Arc::new(Mutex::new(Task::spawn(ctx.clone(), move |ctx, cleanup| {
            body(ctx, cleanup, yielder)
        })));
        let result = Arc::new(Mutex::new(None));

        let cont_task = Arc::clone(&task);
        let cont_result = Arc::clone(&result);
        let cont = Continuation::new(move || {
            let value = Pin::new(&mut *cont_task.lock().expect(ERR_POISONED_LOCK)).take_result();
            *cont_result.lock().expect(ERR_POISONED_LOCK) = Some(value);
        });

        let initiation = Pin::new(&mut *task.lock().expect(ERR_POISONED_LOCK)).initiate(&ctx, cont);

        if let Initiation::Completed = initiation {
            let value = Pin::new(&mut *task.lock().expect(ERR_POISONED_LOCK)).take_result();
            *result.lock().expect(ERR_POISONED_LOCK) = Some(value);
        }

        Self { values: rx, result }
    }

    /// The op that waits for the generator's next value, or `None` once the
    /// body has returned and every already-buffered value has been drained.
    pub fn next(&self) -> impl AsyncOp<Output = Option<T>> + Send + 'static {
        let rx = self.values.clone();
        FutureOp::new(async move { rx.recv().await.ok() })
    }

    /// The spawned body's final outcome, once it has returned - `None` while
    /// it is still running (or for a brief window after it returns, before
    /// the continuation recording it has fired).
    #[must_use]
    pub fn take_result(&self) -> Option<Expected<()>> {
        self.result.lock().expect(ERR_POISONED_LOCK).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsk_core::{add_parent_cleanup, AsyncContext, AsyncOpExt, ErrorKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn nested_task_add_parent_cleanup_targets_the_outer_scope() {
        let ctx = AsyncContext::none();

        let outer = Task::spawn(ctx.clone(), |inner_ctx, outer_scope| async move {
            let inner = Task::spawn(inner_ctx.clone(), move |body_ctx, _inner_scope| async move {
                add_parent_cleanup(&body_ctx, |_ctx| async { Ok(()) });
                Ok(())
            });

            inner.into_future(inner_ctx).await?;
            assert_eq!(outer_scope.pending_count(), 1);
            Ok(())
        });

        let result = outer.into_future(ctx).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn task_runs_body_and_returns_its_result() {
        let ctx = AsyncContext::none();
        let task = Task::spawn(ctx.clone(), |_ctx, _cleanup| async { Ok(21) });

        let result = task.into_future(ctx).await;
        assert_eq!(result, Ok(21));
    }

    #[tokio::test]
    async fn task_runs_cleanup_ops_after_body_completes() {
        let ctx = AsyncContext::none();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_in_body = Arc::clone(&ran);

        let task = Task::spawn(ctx.clone(), move |_ctx, cleanup| {
            let ran = Arc::clone(&ran_in_body);
            async move {
                cleanup.add_cleanup(move |_ctx| {
                    let ran = Arc::clone(&ran);
                    async move {
                        ran.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                });
                Ok(())
            }
        });

        let result = task.into_future(ctx).await;
        assert_eq!(result, Ok(()));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn task_reports_cleanup_failure_even_when_body_succeeded() {
        let ctx = AsyncContext::none();
        let task = Task::spawn(ctx.clone(), |_ctx, cleanup| async move {
            cleanup.add_cleanup(|_ctx| async { Err(ErrorKind::Failed) });
            Ok(())
        });

        let result: Expected<()> = task.into_future(ctx).await;
        assert!(matches!(result, Err(ErrorKind::OneOrMoreCleanupOpsFailed)));
    }

    #[tokio::test]
    async fn generator_yields_values_in_order_then_ends() {
        let ctx = AsyncContext::none();
        let generator = Generator::spawn(
            ctx,
            NonZeroUsize::new(1).unwrap(),
            |_ctx, _cleanup, yielder| async move {
                yielder.yield_value(1).await;
                yielder.yield_value(2).await;
                Ok(())
            },
        );

        let ctx = AsyncContext::none();
        assert_eq!(generator.next().into_future(ctx.clone()).await, Some(1));
        assert_eq!(generator.next().into_future(ctx.clone()).await, Some(2));
        assert_eq!(generator.next().into_future(ctx.clone()).await, None);
    }

    #[tokio::test]
    async fn generator_records_its_body_result_once_finished() {
        let ctx = AsyncContext::none();
        let generator = Generator::spawn(
            ctx,
            NonZeroUsize::new(2).unwrap(),
            |_ctx, _cleanup, yielder| async move {
                yielder.yield_value("only").await;
                Ok(())
            },
        );

        let ctx = AsyncContext::none();
        assert_eq!(
            generator.next().into_future(ctx.clone()).await,
            Some("only")
        );
        assert_eq!(generator.next().into_future(ctx).await, None);

        // Give the completion continuation a chance to run; it fires from
        // the same poll that observed the body's `Poll::Ready`, so this is
        // already satisfied by the `None` above in practice, but a tokio
        // yield keeps the assertion robust against scheduling changes.
        tokio::task::yield_now().await;
        assert_eq!(generator.take_result(), Some(Ok(())));
    }
}
