// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod abstractions;
mod async_task;
mod async_task_executor;
#[cfg(test)]
mod mocks;

pub use abstractions::*;
pub use async_task::*;
pub use async_task_executor::*;
#[cfg(test)]
pub use mocks::*;