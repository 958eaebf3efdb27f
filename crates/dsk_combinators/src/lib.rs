// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Combinators that compose [`dsk_core::AsyncOp`]s: fan-out/fan-in
//! (`until_all_done`, `until_first_*`, `until_all_succeeded`), sequential
//! cascade (`seq_until`), and timed races (`wait_for`/`wait_until`).
//!
//! Every combinator here guarantees the single most load-bearing invariant
//! of this runtime: *every* child op is driven to completion before the
//! combinator's own continuation fires, even when one child's completion
//! triggers cancellation of its siblings. A combinator that returned early
//! while a sibling was still running would let that sibling's eventual
//! completion touch state (captured references, pool handles) after the
//! caller believes the whole operation is over.

mod drive;
mod seq;
mod timed;
mod until_all;
mod until_first;

pub use seq::seq_until;
pub use timed::{wait_for, wait_for_void, wait_until, wait_until_void};
pub use until_all::{until_all_done, until_all_succeeded};
pub use until_first::{until_first_done, until_first_failed, until_first_succeeded};
