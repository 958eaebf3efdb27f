// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::cleanup::CleanupScope;
use crate::resumer::{inline_resumer, Resumer, SharedResumer};

const ERR_POISONED_LOCK: &str = "lock poisoned by a prior panic while holding it";

/// Shared state behind a [`StopSource`]/[`StopToken`] pair.
///
/// Stop callbacks registered after the stop has already fired run inline,
/// during registration, matching the intuitive "you asked, so it's as if it
/// already happened" semantics async-op protocols rely on for late
/// registration.
struct StopState {
    requested: AtomicBool,
    callbacks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

/// The side of a cancellation pair that can request a stop.
#[derive(Clone)]
pub struct StopSource {
    state: Arc<StopState>,
}

/// The side of a cancellation pair that can observe and react to a stop.
#[derive(Clone)]
pub struct StopToken {
    state: Arc<StopState>,
}

impl Default for StopSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSource {
    /// Creates a fresh, not-yet-requested stop source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(StopState {
                requested: AtomicBool::new(false),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns a token that observes this source.
    #[must_use]
    pub fn token(&self) -> StopToken {
        StopToken {
            state: Arc::clone(&self.state),
        }
    }

    /// Requests a stop, running every callback registered so far (and none
    /// registered afterward are missed, since late registration runs
    /// inline). Idempotent: a second call is a no-op.
    pub fn request_stop(&self) {
        if self
            .state
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let callbacks = std::mem::take(
            &mut *self.state.callbacks.lock().expect(ERR_POISONED_LOCK),
        );

        for cb in callbacks {
            cb();
        }
    }

    /// True once [`request_stop`](Self::request_stop) has been called.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }
}

impl StopToken {
    /// True once the paired source has requested a stop.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }

    /// Registers `cb` to run the moment a stop is requested. If a stop was
    /// already requested, `cb` runs immediately, inline, before this method
    /// returns.
    pub fn on_stop(&self, cb: impl FnOnce() + Send + 'static) {
        if self.state.requested.load(Ordering::SeqCst) {
            cb();
            return;
        }

        let mut callbacks = self.state.callbacks.lock().expect(ERR_POISONED_LOCK);

        if self.state.requested.load(Ordering::SeqCst) {
            drop(callbacks);
            cb();
            return;
        }

        callbacks.push(Box::new(cb));
    }
}

impl std::fmt::Debug for StopSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSource")
            .field("stop_requested", &self.stop_requested())
            .finish()
    }
}

impl std::fmt::Debug for StopToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopToken")
            .field("stop_requested", &self.stop_requested())
            .finish()
    }
}

/// A small, cheaply cloned value carrying the three things an async
/// operation may need from its surrounding coroutine: a way to observe
/// cancellation, a place to resume, and a scope to register cleanup ops
/// against.
///
/// Absence of any of the three (`None`) means "not cancelable" / "resume
/// inline" / "no cleanup scope", matching the defaults a bare, context-free
/// call site gets.
#[derive(Clone, Debug)]
pub struct AsyncContext {
    stop_token: Option<StopToken>,
    resumer: SharedResumer,
    cleanup: Option<Arc<CleanupScope>>,
}

impl Default for AsyncContext {
    fn default() -> Self {
        Self {
            stop_token: None,
            resumer: inline_resumer(),
            cleanup: None,
        }
    }
}

impl AsyncContext {
    /// The context with no cancellation, an inline resumer, and no cleanup
    /// scope - the baseline every other context is built by layering atop.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// True if cancellation has been requested on this context's stop token,
    /// if it has one.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop_token
            .as_ref()
            .is_some_and(StopToken::stop_requested)
    }

    /// True if this context could ever observe a stop request (i.e. it
    /// carries a stop token at all).
    #[must_use]
    pub const fn stop_possible(&self) -> bool {
        self.stop_token.is_some()
    }

    /// Registers `cb` to run on stop, if this context can observe stops.
    pub fn on_stop(&self, cb: impl FnOnce() + Send + 'static) {
        if let Some(token) = &self.stop_token {
            token.on_stop(cb);
        }
    }

    /// This context's resumer.
    #[must_use]
    pub fn resumer(&self) -> &SharedResumer {
        &self.resumer
    }

    /// This context's cleanup scope, if it has one.
    #[must_use]
    pub fn cleanup_scope(&self) -> Option<&Arc<CleanupScope>> {
        self.cleanup.as_ref()
    }

    /// Builds a context identical to `self` but with `token` substituted for
    /// its stop token.
    #[must_use]
    pub fn with_stop_token(&self, token: StopToken) -> Self {
        Self {
            stop_token: Some(token),
            resumer: Arc::clone(&self.resumer),
            cleanup: self.cleanup.clone(),
        }
    }

    /// Builds a context identical to `self` but with `resumer` substituted
    /// for its resumer.
    #[must_use]
    pub fn with_resumer(&self, resumer: SharedResumer) -> Self {
        Self {
            stop_token: self.stop_token.clone(),
            resumer,
            cleanup: self.cleanup.clone(),
        }
    }

    /// Builds a context identical to `self` but with `scope` substituted for
    /// its cleanup scope.
    #[must_use]
    pub fn with_cleanup_scope(&self, scope: Arc<CleanupScope>) -> Self {
        Self {
            stop_token: self.stop_token.clone(),
            resumer: Arc::clone(&self.resumer),
            cleanup: Some(scope),
        }
    }

    /// Builds a context identical to `self` but with cancellation disabled,
    /// regardless of what `self` carried. Used by [`CleanupScope`] to run
    /// its cleanup ops uncancelably during scope exit.
    #[must_use]
    pub fn without_cancellation(&self) -> Self {
        Self {
            stop_token: None,
            resumer: Arc::clone(&self.resumer),
            cleanup: self.cleanup.clone(),
        }
    }
}

/// Layers `overrides` atop `base`, left to right, without mutating `base`.
/// Each override is one of [`StopToken`], [`SharedResumer`], or
/// `Arc<CleanupScope>`; apply them via the typed `with_*` methods when you
/// know which one you have; this free function exists for the common
/// "just a stop token, or just a resumer" call sites.
#[must_use]
pub fn make_async_ctx(base: &AsyncContext) -> AsyncContext {
    base.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn stop_request_runs_registered_callbacks() {
        let source = StopSource::new();
        let token = source.token();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        token.on_stop(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!token.stop_requested());
        source.request_stop();
        assert!(token.stop_requested());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_registration_after_stop_runs_inline() {
        let source = StopSource::new();
        let token = source.token();
        source.request_stop();

        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);
        token.on_stop(move || r.store(true, Ordering::SeqCst));

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn double_stop_request_is_idempotent() {
        let source = StopSource::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        source.token().on_stop(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        source.request_stop();
        source.request_stop();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_context_has_no_cancellation() {
        let ctx = AsyncContext::none();
        assert!(!ctx.stop_possible());
        assert!(!ctx.stop_requested());
    }

    #[test]
    fn layered_context_carries_stop_token() {
        let source = StopSource::new();
        let ctx = AsyncContext::none().with_stop_token(source.token());
        assert!(ctx.stop_possible());
        source.request_stop();
        assert!(ctx.stop_requested());
    }

    #[test]
    fn without_cancellation_drops_stop_token_but_keeps_resumer() {
        let source = StopSource::new();
        let ctx = AsyncContext::none().with_stop_token(source.token());
        let uncancelable = ctx.without_cancellation();
        assert!(!uncancelable.stop_possible());
    }
}
