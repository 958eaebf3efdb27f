// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use dsk_core::{AsyncContext, AsyncOp, DeferredOp};

use crate::drive::drive_with_failed;

/// Sequential cascade: initiates `ops[0]`; once it completes, evaluates
/// `should_stop` against its output. If it returns `true`, or the op was
/// the last one in `ops`, that output is the overall result. Otherwise the
/// next op is initiated, and so on. At most one child is ever active at a
/// time.
///
/// If `Op::Output` is itself a `Result<_, ErrorKind>`, the conventional
/// `should_stop` is `|r| !matches!(r, Err(ErrorKind::NoneErr))` -
/// `ErrorKind::NoneErr` is the reserved "keep going, this wasn't a real
/// stopping condition" sentinel for exactly this shape.
///
/// # Panics
///
/// Panics if `ops` is empty - there would be no result to produce.
pub fn seq_until<Op, P>(ops: Vec<Op>, should_stop: P) -> DeferredOp<Op::Output>
where
    Op: AsyncOp + Send + 'static,
    Op::Output: Send + 'static,
    P: Fn(&Op::Output) -> bool + Send + 'static,
{
    assert!(!ops.is_empty(), "seq_until requires at least one op");

    DeferredOp::new(move |ctx| async move {
        let n = ops.len();
        let mut last = None;

        for (idx, op) in ops.into_iter().enumerate() {
            let (_failed, output) = drive_with_failed(op, ctx.clone()).await;
            let is_last = idx + 1 == n;
            let stop = is_last || should_stop(&output);
            last = Some(output);

            if stop {
                break;
            }
        }

        last.expect("loop runs at least once since ops is non-empty")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsk_core::{AsyncOpExt, ErrorKind, FutureOp};

    #[tokio::test]
    async fn stops_at_the_first_satisfying_result() {
        let ops = vec![
            FutureOp::new(async { Err::<u32, _>(ErrorKind::NoneErr) }),
            FutureOp::new(async { Ok::<u32, ErrorKind>(7) }),
            FutureOp::new(async { Ok::<u32, ErrorKind>(99) }),
        ];

        let result = seq_until(ops, |r: &Result<u32, ErrorKind>| {
            !matches!(r, Err(ErrorKind::NoneErr))
        })
        .into_future(AsyncContext::none())
        .await;

        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn falls_through_to_the_last_op_if_nothing_satisfies() {
        let ops = vec![
            FutureOp::new(async { Err::<u32, _>(ErrorKind::NoneErr) }),
            FutureOp::new(async { Err::<u32, _>(ErrorKind::NoneErr) }),
        ];

        let result = seq_until(ops, |r: &Result<u32, ErrorKind>| {
            !matches!(r, Err(ErrorKind::NoneErr))
        })
        .into_future(AsyncContext::none())
        .await;

        assert_eq!(result, Err(ErrorKind::NoneErr));
    }

    #[tokio::test]
    #[should_panic(expected = "at least one op")]
    async fn panics_on_empty_input() {
        let _ = seq_until::<FutureOp<std::future::Ready<()>>, _>(vec![], |_| true);
    }
}
