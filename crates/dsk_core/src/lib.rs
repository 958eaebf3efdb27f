// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Async-operation protocol, error model, and context primitives shared by
//! every `dsk` runtime crate.
//!
//! - [`error`] - the closed [`ErrorKind`] enum and the `Result`/`Expected`
//!   aliases built on it.
//! - [`continuation`] - [`Continuation`], the single-invocation "what to run
//!   next" closure wrapper.
//! - [`resumer`] - [`Resumer`], the "where to run it" abstraction, and the
//!   synchronous [`InlineResumer`].
//! - [`context`] - [`AsyncContext`], [`StopSource`]/[`StopToken`], carried
//!   through every coroutine and op.
//! - [`cleanup`] - [`CleanupScope`], the LIFO list of pending cleanup ops.
//! - [`op`] - [`AsyncOp`], [`Initiation`], [`manual_initiate`], and
//!   [`FutureOp`], the adapter that lets any ordinary future act as one.
//!
//! Everything else in this workspace - schedulers, combinators, pools,
//! queues - is built on top of these six things.

pub mod cleanup;
pub mod context;
pub mod continuation;
pub mod error;
pub mod op;
pub mod resumer;

pub use cleanup::{
    add_parent_cleanup, current_scope, parent_scope, pop_scope, push_scope, CleanupScope,
};
pub use context::{make_async_ctx, AsyncContext, StopSource, StopToken};
pub use continuation::Continuation;
pub use error::{ErrorCode, ErrorKind, Expected, Result};
pub use op::{
    manual_initiate, op_as_future, AsyncOp, AsyncOpExt, BoxedOp, DeferredOp, FutureOp, Initiation,
};
pub use resumer::{inline_resumer, InlineResumer, Resumer, SharedResumer};
