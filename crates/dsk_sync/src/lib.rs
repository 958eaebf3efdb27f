// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bounded producer/consumer coordination primitives built on
//! [`dsk_core::AsyncOp`]: a resource pool ([`pool::ResPool`],
//! [`pool::ResPoolMap`]) and a bounded queue ([`queue::ResQueue`]).
//!
//! Both share the same shape: a `Mutex`-protected state machine, a FIFO
//! waiter deque that tombstones canceled entries in place rather than
//! shifting the deque, and direct value handoff from whichever call frees
//! capacity to the oldest live waiter - never a wakeup that merely tells a
//! waiter to go recheck shared state, since a fresh caller could race in and
//! steal what was meant for it.

pub mod pool;
pub mod queue;

pub use pool::{PoolHandle, ResPool, ResPoolMap};
pub use queue::ResQueue;
