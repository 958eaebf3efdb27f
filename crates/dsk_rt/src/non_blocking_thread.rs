// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! There exist some runtime APIs that block. These APIs are intended for compatibility and
//! convenience purposes when called from a thread the runtime doesn't own. They are not safe to call from
//! threads that are marked as non-blocking threads and attempting to do so will panic.
//!
//! The runtime marks all worker threads as non-blocking threads. To be clear, the runtime itself is
//! allowed to run blocking code on them but public API entrypoints meant for intentional
//! blocking on results are forbidden on these threads.

use std::cell::Cell;

/// Flags the current thread as a non-blocking thread. Attempting to call blocking runtime
/// APIs on this thread will result in a panic.
pub fn flag_current_thread() {
    IS_FLAGGED.with(|x| {
        x.set(true);
    });
}

pub fn assert_not_flagged() {
    IS_FLAGGED.with(|x| {
        assert!(!x.get(), "blocking runtime APIs must not be called from threads owned by the runtime");
    });
}

thread_local! {
    /// The functions in this module may be called from any thread (via `Runtime`) and do not have
    /// access to the runtime's task context, as the functions are not necessarily executing
    /// as part of a task managed by the runtime. Therefore, we use a regular thread-local variable.
    static IS_FLAGGED: Cell<bool> = const { Cell::new(false) };
}
