// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Background jobs: inventory refresh and index reaping
//!
//! Both run on fixed intervals. A failed pass is logged and retried
//! implicitly on the next tick; there is no backoff policy.

pub mod reap;
pub mod refresh;

use std::sync::Arc;
use std::time::Duration;

use crate::context::ApiContext;

/// Spawn the refresher and reaper loops
pub fn spawn(ctx: Arc<ApiContext>) {
    let refresh_ctx = ctx.clone();
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(refresh_ctx.config.refresh_interval_secs));
        loop {
            ticker.tick().await;
            if let Err(error) = refresh::run(&refresh_ctx).await {
                tracing::error!(%error, "inventory refresh pass failed; retrying on the next tick");
            }
        }
    });

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(ctx.config.reap_interval_secs));
        loop {
            ticker.tick().await;
            if let Err(error) = reap::run(&ctx).await {
                tracing::error!(%error, "reaper pass failed; retrying on the next tick");
            }
        }
    });
}
