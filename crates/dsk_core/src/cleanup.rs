// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::context::AsyncContext;
use crate::error::{ErrorKind, Expected};

const ERR_POISONED_LOCK: &str = "lock poisoned by a prior panic while holding it";

type CleanupOp = Box<dyn FnOnce(AsyncContext) -> BoxFuture<'static, Expected> + Send>;

/// An implicit, coroutine-local LIFO list of pending cleanup operations.
///
/// Ops are run in reverse registration order at scope exit, each against a
/// context with cancellation disabled - per `spec.md`'s cleanup-scope
/// contract, a cleanup op must be allowed to run to completion even if the
/// coroutine that registered it was itself being canceled.
#[derive(Default)]
pub struct CleanupScope {
    ops: Mutex<Vec<CleanupOp>>,
}

impl CleanupScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cleanup op, expressed as a closure from the scope's exit
    /// context to a future producing [`Expected`].
    pub fn add_cleanup<F, Fut>(&self, op: F)
    where
        F: FnOnce(AsyncContext) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Expected> + Send + 'static,
    {
        let boxed: CleanupOp = Box::new(move |ctx| Box::pin(op(ctx)));
        self.ops.lock().expect(ERR_POISONED_LOCK).push(boxed);
    }

    /// Runs every registered cleanup op in reverse order, against `ctx` with
    /// cancellation disabled, draining the scope. Returns
    /// [`ErrorKind::OneOrMoreCleanupOpsFailed`] if any op failed; all ops
    /// still run regardless of earlier failures.
    pub async fn run_all(&self, ctx: &AsyncContext) -> Expected {
        let ops = std::mem::take(&mut *self.ops.lock().expect(ERR_POISONED_LOCK));
        let uncancelable = ctx.without_cancellation();

        let mut any_failed = false;

        for op in ops.into_iter().rev() {
            if op(uncancelable.clone()).await.is_err() {
                any_failed = true;
            }
        }

        if any_failed {
            Err(ErrorKind::OneOrMoreCleanupOpsFailed)
        } else {
            Ok(())
        }
    }

    /// Number of cleanup ops currently pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.ops.lock().expect(ERR_POISONED_LOCK).len()
    }
}

impl std::fmt::Debug for CleanupScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupScope")
            .field("pending_count", &self.pending_count())
            .finish()
    }
}

thread_local! {
    /// This thread's stack of currently-running tasks' cleanup scopes,
    /// innermost last. `Task` pushes its own scope before each poll of its
    /// body and pops it after, so a scope nested synchronously inside
    /// another task's poll (because its caller `.await`s it directly,
    /// rather than joining it from elsewhere) sees both its own scope
    /// ([`current_scope`]) and its caller's ([`parent_scope`]).
    static SCOPE_STACK: RefCell<Vec<Arc<CleanupScope>>> = const { RefCell::new(Vec::new()) };
}

/// Pushes `scope` as the innermost entry on this thread's scope stack.
/// Every push must be matched by exactly one [`pop_scope`].
pub fn push_scope(scope: &Arc<CleanupScope>) {
    SCOPE_STACK.with(|stack| stack.borrow_mut().push(Arc::clone(scope)));
}

/// Pops the innermost entry off this thread's scope stack.
///
/// # Panics
///
/// Panics if the stack is empty - every call site pushes before polling and
/// pops after, so an empty stack here means a push/pop pair was dropped.
pub fn pop_scope() {
    SCOPE_STACK.with(|stack| {
        stack
            .borrow_mut()
            .pop()
            .expect("pop_scope called with an empty scope stack");
    });
}

/// The innermost scope currently on this thread's stack, if any task's body
/// is mid-poll here.
#[must_use]
pub fn current_scope() -> Option<Arc<CleanupScope>> {
    SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
}

/// The scope one level up from [`current_scope`] - the scope of whichever
/// task synchronously `.await`s the one currently running, if any.
#[must_use]
pub fn parent_scope() -> Option<Arc<CleanupScope>> {
    SCOPE_STACK.with(|stack| {
        let stack = stack.borrow();
        stack
            .len()
            .checked_sub(2)
            .map(|index| Arc::clone(&stack[index]))
    })
}

/// Registers `op` against the parent of whichever task's body is currently
/// running on this thread, instead of its own scope - for cleanup that must
/// outlive the inner task's own scope exit (a rollback that belongs to
/// whatever acquired the resource, not a transaction wrapper that merely
/// borrowed it for one nested call). Falls back to `ctx`'s own scope, if it
/// has one, when there is no parent on the stack (e.g. a top-level task).
pub fn add_parent_cleanup<F, Fut>(ctx: &AsyncContext, op: F)
where
    F: FnOnce(AsyncContext) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Expected> + Send + 'static,
{
    if let Some(scope) = parent_scope().or_else(|| ctx.cleanup_scope().cloned()) {
        scope.add_cleanup(op);
    }
}
