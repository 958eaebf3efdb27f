// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use dsk_rt::{BasicThreadState, main};

#[main]
async fn main(cx: BasicThreadState) {
    println!("Hello, world!");

    cx.local_scheduler()
        .spawn(async move || {
            println!("Hello again!");
        })
        .await;
}