// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use dsk_core::{AsyncContext, AsyncOp, AsyncOpExt};

/// Drives `op` to completion and reports whether it failed alongside its
/// output, the way combinators that fan out over heterogeneous success/
/// failure outcomes (`until_first_succeeded`, `until_all_succeeded`, the
/// timed races) need. Plain [`dsk_core::op_as_future`] only hands back the
/// output; `is_failed` has to be read before [`AsyncOp::take_result`]
/// consumes it, so this wrapper exists to not duplicate that ordering at
/// every call site.
pub(crate) async fn drive_with_failed<Op>(op: Op, ctx: AsyncContext) -> (bool, Op::Output)
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    let mut op = Box::pin(op);

    if op.as_mut().is_immediate() {
        let failed = op.as_mut().is_failed();
        return (failed, op.as_mut().take_result());
    }

    // Re-use the initiate/continuation dance via `op_as_future`, but we need
    // `is_failed` read before `take_result`, so this inlines the same
    // protocol rather than calling through.
    let (tx, rx) = oneshot::channel::<()>();
    let cont = dsk_core::Continuation::new(move || {
        drop(tx.send(()));
    });

    match op.as_mut().initiate(&ctx, cont) {
        dsk_core::Initiation::Completed => {}
        dsk_core::Initiation::WillComplete => {
            rx.await.expect("op dropped its continuation without invoking it");
        }
    }

    let failed = op.as_mut().is_failed();
    (failed, op.as_mut().take_result())
}
