// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use dsk_core::{AsyncOp, DeferredOp, ErrorKind, StopSource};
use dsk_time::{Clock, Delay, Timestamp};

use crate::drive::drive_with_failed;

/// Races `op` against a `duration`-long timer sharing one stop-source with
/// it. Whichever finishes first "wins": if `op` wins, its output is
/// returned; if the timer wins, `op`'s context is signaled to stop, `op` is
/// awaited to completion anyway, and [`ErrorKind::Timeout`] is returned.
/// Either way the continuation only fires once both branches have
/// finished.
pub fn wait_for<Op>(
    clock: &Clock,
    duration: Duration,
    op: Op,
) -> DeferredOp<Result<Op::Output, ErrorKind>>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    let clock = clock.clone();

    DeferredOp::new(move |ctx| async move {
        let shared = StopSource::new();
        {
            let shared = shared.clone();
            ctx.on_stop(move || shared.request_stop());
        }
        let op_ctx = ctx.with_stop_token(shared.token());

        let timer = Box::pin(Delay::with_clock(&clock, duration));
        let op_fut = Box::pin(drive_with_failed(op, op_ctx));

        match futures::future::select(timer, op_fut).await {
            futures::future::Either::Left(((), remaining_op)) => {
                tracing::debug!(?duration, "wait_for: timer won, canceling the op");
                shared.request_stop();
                // The op must still be allowed to observe cancellation and
                // actually finish before this combinator's own
                // continuation fires.
                let (_failed, _output) = remaining_op.await;
                Err(ErrorKind::Timeout)
            }
            futures::future::Either::Right(((_failed, output), _remaining_timer)) => {
                // The op finished first - the timer has no side effects to
                // await, so it is simply dropped here, canceling it.
                Ok(output)
            }
        }
    })
}

/// Absolute-deadline form of [`wait_for`]: races `op` against the clock
/// reaching `deadline`. A `deadline` already in the past behaves like a
/// zero-duration timer - the timer branch wins immediately, unless `op` is
/// itself immediate.
pub fn wait_until<Op>(
    clock: &Clock,
    deadline: Timestamp,
    op: Op,
) -> DeferredOp<Result<Op::Output, ErrorKind>>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
{
    let duration = deadline
        .checked_duration_since(clock.now())
        .unwrap_or(Duration::ZERO);

    wait_for(clock, duration, op)
}

/// Void single-argument form: completes after `duration` with no error.
pub fn wait_for_void(clock: &Clock, duration: Duration) -> DeferredOp<()> {
    let clock = clock.clone();
    DeferredOp::new(move |_ctx| async move {
        Delay::with_clock(&clock, duration).await;
    })
}

/// Void single-argument form: completes once the clock reaches `deadline`.
pub fn wait_until_void(clock: &Clock, deadline: Timestamp) -> DeferredOp<()> {
    let duration = deadline
        .checked_duration_since(clock.now())
        .unwrap_or(Duration::ZERO);

    wait_for_void(clock, duration)
}
