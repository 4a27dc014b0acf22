// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Reaper
//!
//! Confirms every index record against the live control plane and deletes
//! records for desktops that no longer exist. No batching and no retries:
//! a control-plane or index failure mid-scan aborts the pass, and the next
//! scheduled pass picks up where the index then stands.

use anyhow::{Context, Result};
use portal_api::WorkspaceRecord;

use crate::context::ApiContext;

/// One full reap pass over the index
pub async fn run(ctx: &ApiContext) -> Result<()> {
    // Collect the whole index first so deletions don't disturb the scan
    let mut records: Vec<WorkspaceRecord> = Vec::new();
    let mut start_key: Option<String> = None;
    loop {
        tracing::debug!(start_key = ?start_key, "index scan page");
        let page = ctx
            .index
            .scan(start_key.as_deref())
            .await
            .context("index scan failed")?;
        records.extend(page.records);
        match page.next_key {
            Some(key) => start_key = Some(key),
            None => break,
        }
    }

    for record in records {
        let id = &record.instance_id;
        tracing::info!(instance_id = %id, region = %record.region, "confirming instance");

        let client = ctx.vdi_client(&record.region)?;
        let live = client
            .describe_desktop(id)
            .await
            .with_context(|| format!("control-plane lookup failed for {}", id))?;

        if !live.is_empty() {
            tracing::debug!(instance_id = %id, "instance alive");
            continue;
        }

        // The desktop is gone; clean up its directory object and its record
        match &record.computer_name {
            Some(computer_name) => directory_cleanup(computer_name),
            None => {
                tracing::info!(instance_id = %id, "no computer name recorded, skipping directory cleanup");
            }
        }

        ctx.index
            .delete(id)
            .await
            .with_context(|| format!("index delete failed for {}", id))?;
        tracing::info!(instance_id = %id, "stale record removed");
    }

    Ok(())
}

/// Directory cleanup for a decommissioned desktop's computer object.
///
/// TODO: bind to the directory service and remove the computer object so
/// stale machine accounts do not accumulate. Until then this only records
/// the intent.
fn directory_cleanup(computer_name: &str) {
    tracing::info!(computer_name, "directory cleanup requested (not implemented)");
}
