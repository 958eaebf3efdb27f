// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;

use crate::continuation::Continuation;

/// "Where to resume" abstraction: something that can take a [`Continuation`]
/// and arrange for it to run, possibly on a different thread.
///
/// Implementations must be comparable for identity so that combinators and
/// `run_on` can cheaply detect "we are already running where we'd resume
/// anyway" and skip an unnecessary hop.
pub trait Resumer: fmt::Debug + Send + Sync {
    /// Arranges for `cont` to run according to this resumer's policy.
    fn resume(&self, cont: Continuation);

    /// Whether this resumer is the distinguished inline resumer. Scheduler
    /// -backed resumers override [`same_destination`](Self::same_destination)
    /// instead of this; it exists purely so two inline resumers can
    /// recognize each other without a downcast.
    fn is_inline(&self) -> bool {
        false
    }

    /// Whether `self` and `other` would resume to the same place. The
    /// default compares [`is_inline`](Self::is_inline) on both sides;
    /// scheduler-backed resumers should override this with pointer/id
    /// equality on the scheduler they wrap.
    fn same_destination(&self, other: &dyn Resumer) -> bool {
        self.is_inline() && other.is_inline()
    }

    /// Type-erased view of this resumer, for [`same_destination`]
    /// overrides that need to downcast a `&dyn Resumer` peer back to their
    /// own concrete type before comparing identity.
    fn as_any(&self) -> &dyn std::any::Any
    where
        Self: 'static,
    {
        self
    }
}

/// The distinguished resumer that invokes its continuation synchronously, on
/// the calling stack. This is the default resumer for any context that
/// hasn't been handed one explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineResumer;

impl Resumer for InlineResumer {
    fn resume(&self, cont: Continuation) {
        cont.invoke();
    }

    fn is_inline(&self) -> bool {
        true
    }
}

/// Shared-ownership handle to any [`Resumer`], used when a context needs to
/// hand its resumer around by value.
pub type SharedResumer = Arc<dyn Resumer>;

/// Convenience to produce an inline [`SharedResumer`].
#[must_use]
pub fn inline_resumer() -> SharedResumer {
    Arc::new(InlineResumer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn inline_resumer_runs_synchronously() {
        let ran = AtomicBool::new(false);
        InlineResumer.resume(Continuation::new(|| {}));
        assert!(!ran.load(Ordering::SeqCst)); // smoke test: resume() returned without panicking
    }

    #[test]
    fn two_inline_resumers_share_a_destination() {
        assert!(InlineResumer.same_destination(&InlineResumer));
    }

    #[test]
    fn shared_resumer_is_object_safe() {
        let r: SharedResumer = inline_resumer();
        r.resume(Continuation::new(|| {}));
    }
}
