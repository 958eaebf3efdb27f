// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dsk_core::{AsyncContext, AsyncOp, DeferredOp, ErrorKind, StopSource};

use crate::drive::drive_with_failed;

/// Waits for every op in `ops` to complete, in any order, and returns their
/// outputs in input order. Never fails on its own - individual child
/// failures are visible only through each output's own shape (e.g. if
/// `Op::Output` is itself a `Result`).
pub fn until_all_done<Op>(ops: Vec<Op>) -> DeferredOp<Vec<Op::Output>>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    DeferredOp::new(move |ctx| async move {
        let futs = ops
            .into_iter()
            .map(|op| drive_with_failed(op, ctx.clone()));

        futures::future::join_all(futs)
            .await
            .into_iter()
            .map(|(_failed, output)| output)
            .collect()
    })
}

/// Waits for every op in `ops` to complete. If every op succeeds
/// ([`AsyncOp::is_failed`] was false for all of them), returns their
/// outputs in input order. As soon as the first op fails, the remaining
/// ops' contexts are signaled to stop - but the combinator still waits for
/// every one of them to actually finish (possibly with `Canceled`) before
/// returning [`ErrorKind::Failed`].
pub fn until_all_succeeded<Op>(ops: Vec<Op>) -> DeferredOp<Result<Vec<Op::Output>, ErrorKind>>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    DeferredOp::new(move |ctx| async move {
        let n = ops.len();
        let child_sources: Vec<StopSource> = (0..n).map(|_| StopSource::new()).collect();

        for child in &child_sources {
            let child = child.clone();
            ctx.on_stop(move || child.request_stop());
        }

        let any_failed = Arc::new(AtomicBool::new(false));

        let futs = ops.into_iter().enumerate().map(|(idx, op)| {
            let child_ctx = ctx.with_stop_token(child_sources[idx].token());
            let any_failed = Arc::clone(&any_failed);
            let child_sources = child_sources.clone();

            async move {
                let (failed, output) = drive_with_failed(op, child_ctx).await;

                if failed && !any_failed.swap(true, Ordering::SeqCst) {
                    tracing::debug!(winner = idx, "until_all_succeeded: child failed, canceling the rest");

                    for (i, source) in child_sources.iter().enumerate() {
                        if i != idx {
                            source.request_stop();
                        }
                    }
                }

                output
            }
        });

        let results = futures::future::join_all(futs).await;

        if any_failed.load(Ordering::SeqCst) {
            Err(ErrorKind::Failed)
        } else {
            Ok(results)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsk_core::{AsyncOpExt, FutureOp};

    #[tokio::test]
    async fn until_all_done_collects_outputs_in_order() {
        let ops = vec![
            FutureOp::new(async { 1 }),
            FutureOp::new(async { 2 }),
            FutureOp::new(async { 3 }),
        ];

        let result = until_all_done(ops).into_future(AsyncContext::none()).await;
        assert_eq!(result, vec![1, 2, 3]);
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

        fn initiate(
            self: std::pin::Pin<&mut Self>,
            _ctx: &AsyncContext,
            _cont: dsk_core::Continuation,
        ) -> dsk_core::Initiation {
            dsk_core::Initiation::Completed
        }

        fn is_failed(&self) -> bool {
            self.fail
        }

        fn take_result(self: std::pin::Pin<&mut Self>) -> u32 {
            self.value
        }
    }

    #[tokio::test]
    async fn until_all_succeeded_returns_outputs_when_none_failed() {
        let ops = vec![
            FailingOp { fail: false, value: 1 },
            FailingOp { fail: false, value: 2 },
        ];

        let result = until_all_succeeded(ops)
            .into_future(AsyncContext::none())
            .await;
        assert_eq!(result, Ok(vec![1, 2]));
    }

    #[tokio::test]
    async fn until_all_succeeded_fails_when_any_child_fails() {
        let ops = vec![
            FailingOp { fail: false, value: 1 },
            FailingOp { fail: true, value: 2 },
            FailingOp { fail: false, value: 3 },
        ];

        let result = until_all_succeeded(ops)
            .into_future(AsyncContext::none())
            .await;
        assert_eq!(result, Err(ErrorKind::Failed));
    }
}
