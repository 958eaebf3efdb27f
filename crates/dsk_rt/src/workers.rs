// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod async_worker;
mod spawn_queue;
mod system_worker;
mod task;

pub use async_worker::*;
pub use spawn_queue::*;
pub use system_worker::*;
pub use task::*;