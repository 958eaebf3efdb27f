// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The coroutine runtime: spawns and drives [`Task`]/[`Generator`], and owns the
//! dispatcher/worker machinery everything else in this workspace schedules onto.
//!
//! Its main responsibility is task scheduling.

// Public API surface.
mod builder;
mod coroutine;
mod error;
mod join;
mod runtime;
mod sync_wait;
mod tasks;

pub use builder::*;
pub use coroutine::{Generator, Task, Yielder};
pub use error::*;
pub use join::*;
pub use runtime::*;
pub use sync_wait::{resume_on, run_on, start_on, sync_wait, ResumeOn};
pub use tasks::*;

// Internal to the crate but re-exported at crate root for reduced hassle.
mod constants;
mod dispatch;
mod executor;
mod io;
mod wakers;
mod workers;
mod yielding;

pub(crate) use constants::ERR_POISONED_LOCK;
#[allow(clippy::wildcard_imports, reason = "TODO: Remove this wildcard import")]
pub(crate) use dispatch::*;
#[allow(clippy::wildcard_imports, reason = "TODO: Remove this wildcard import")]
pub(crate) use executor::*;
pub(crate) use io::{WakerFacade, WakerWaiterFacade};
#[allow(clippy::wildcard_imports, reason = "TODO: Remove this wildcard import")]
pub(crate) use wakers::*;
#[allow(clippy::wildcard_imports, reason = "TODO: Remove this wildcard import")]
pub(crate) use workers::*;
pub(crate) use yielding::YieldFuture;

// Not re-exported internals because the module name is an important identifying factor.
mod non_blocking_thread;
mod once_event;

// These are just special.
mod macros;

#[cfg(feature = "macros")]
pub use macros::{main, test};