// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// An erased, move-only "what to do next" callback.
///
/// Ownership is the enforcement mechanism for "invoked at most once": calling
/// a [`Continuation`] consumes it, so there is no runtime flag to check or
/// forget to check.
pub struct Continuation(Box<dyn FnOnce() + Send>);

impl Continuation {
    /// Wraps an arbitrary `FnOnce` as a continuation.
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Invokes the continuation, consuming it.
    pub fn invoke(self) {
        (self.0)();
    }
}

impl std::fmt::Debug for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn invoke_runs_exactly_once() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);

        let cont = Continuation::new(move || ran2.store(true, Ordering::SeqCst));
        cont.invoke();

        assert!(ran.load(Ordering::SeqCst));
    }
}
