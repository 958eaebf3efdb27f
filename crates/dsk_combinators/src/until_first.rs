// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use dsk_core::{AsyncContext, AsyncOp, DeferredOp, ErrorKind, StopSource};

use crate::drive::drive_with_failed;

/// Races every op in `ops` against the selection predicate `matches(failed)`.
/// The first child whose completion satisfies the predicate "wins": its
/// index and output are returned, and every other child's context is
/// signaled to stop. All children are still awaited to completion before
/// this returns - the losers' results are simply discarded.
///
/// Returns [`ErrorKind::NotFound`] if `ops` is empty or no child ever
/// satisfies `matches`.
async fn race<Op>(
    ops: Vec<Op>,
    ctx: AsyncContext,
    matches: impl Fn(bool) -> bool + Send + Sync + 'static,
) -> Result<(usize, Op::Output), ErrorKind>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    let n = ops.len();

    if n == 0 {
        return Err(ErrorKind::NotFound);
    }

    let child_sources: Vec<StopSource> = (0..n).map(|_| StopSource::new()).collect();

    for child in &child_sources {
        let child = child.clone();
        ctx.on_stop(move || child.request_stop());
    }

    let won = Arc::new(AtomicBool::new(false));
    let winner = Arc::new(AtomicUsize::new(usize::MAX));
    let matches = Arc::new(matches);

    let futs = ops.into_iter().enumerate().map(|(idx, op)| {
        let child_ctx = ctx.with_stop_token(child_sources[idx].token());
        let won = Arc::clone(&won);
        let winner = Arc::clone(&winner);
        let matches = Arc::clone(&matches);
        let child_sources = child_sources.clone();

        async move {
            let (failed, output) = drive_with_failed(op, child_ctx).await;

            if matches(failed) && won.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                winner.store(idx, Ordering::SeqCst);
                tracing::debug!(winner = idx, "race: child matched, canceling siblings");

                for (i, source) in child_sources.iter().enumerate() {
                    if i != idx {
                        source.request_stop();
                    }
                }
            }

            (idx, output)
        }
    });

    let mut results = futures::future::join_all(futs).await;

    let winning_idx = winner.load(Ordering::SeqCst);
    if winning_idx == usize::MAX {
        return Err(ErrorKind::NotFound);
    }

    let position = results
        .iter()
        .position(|(idx, _)| *idx == winning_idx)
        .expect("winning index must be among the driven children");

    let (idx, output) = results.swap_remove(position);
    Ok((idx, output))
}

/// Returns the index and output of whichever op in `ops` completes first,
/// regardless of success or failure. All other ops are still awaited to
/// completion (and their contexts are signaled to stop as soon as the
/// winner is known).
pub fn until_first_done<Op>(ops: Vec<Op>) -> DeferredOp<Result<(usize, Op::Output), ErrorKind>>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    DeferredOp::new(move |ctx| race(ops, ctx, |_failed| true))
}

/// Like [`until_first_done`], but only a non-failing completion can win.
/// Returns [`ErrorKind::NotFound`] if every op fails.
pub fn until_first_succeeded<Op>(
    ops: Vec<Op>,
) -> DeferredOp<Result<(usize, Op::Output), ErrorKind>>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    DeferredOp::new(move |ctx| race(ops, ctx, |failed| !failed))
}

/// Like [`until_first_done`], but only a failing completion can win.
/// Returns [`ErrorKind::NotFound`] if every op succeeds.
pub fn until_first_failed<Op>(ops: Vec<Op>) -> DeferredOp<Result<(usize, Op::Output), ErrorKind>>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    DeferredOp::new(move |ctx| race(ops, ctx, |failed| failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsk_core::{AsyncOpExt, Continuation, FutureOp, Initiation};
    use std::pin::Pin;
    use std::time::Duration;

    #[tokio::test]
    async fn until_first_done_returns_empty_as_not_found() {
        let result = until_first_done::<FutureOp<std::future::Ready<()>>>(vec![])
            .into_future(AsyncContext::none())
            .await;
        assert_eq!(result, Err(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn until_first_done_picks_the_fastest_child() {
        let ops = vec![
            FutureOp::new(Box::pin(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                "slow"
            }) as Pin<Box<dyn Future<Output = &'static str> + Send>>),
            FutureOp::new(Box::pin(async { "fast" })
                as Pin<Box<dyn Future<Output = &'static str> + Send>>),
        ];

        let (idx, output) = until_first_done(ops)
            .into_future(AsyncContext::none())
            .await
            .unwrap();

        assert_eq!(idx, 1);
        assert_eq!(output, "fast");
    }

    #[derive(Debug)]
    struct FailingOp {
        fail: bool,
        value: u32,
    }

    impl AsyncOp for FailingOp {
        type Output = u32;

        fn is_immediate(&self) -> bool {
            true
        }

        fn initiate(self: Pin<&mut Self>, _ctx: &AsyncContext, _cont: Continuation) -> Initiation {
            Initiation::Completed
        }

        fn is_failed(&self) -> bool {
            self.fail
        }

        fn take_result(self: Pin<&mut Self>) -> u32 {
            self.value
        }
    }

    #[tokio::test]
    async fn until_first_succeeded_skips_failures() {
        let ops = vec![
            FailingOp { fail: true, value: 1 },
            FailingOp { fail: false, value: 2 },
        ];

        let (idx, output) = until_first_succeeded(ops)
            .into_future(AsyncContext::none())
            .await
            .unwrap();

        assert_eq!(idx, 1);
        assert_eq!(output, 2);
    }

    #[tokio::test]
    async fn until_first_succeeded_not_found_when_all_fail() {
        let ops = vec![
            FailingOp { fail: true, value: 1 },
            FailingOp { fail: true, value: 2 },
        ];

        let result = until_first_succeeded(ops)
            .into_future(AsyncContext::none())
            .await;

        assert_eq!(result, Err(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn until_first_failed_picks_the_failing_child() {
        let ops = vec![
            FailingOp { fail: false, value: 1 },
            FailingOp { fail: true, value: 2 },
        ];

        let (idx, output) = until_first_failed(ops)
            .into_future(AsyncContext::none())
            .await
            .unwrap();

        assert_eq!(idx, 1);
        assert_eq!(output, 2);
    }
}
