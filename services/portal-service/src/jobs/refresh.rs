// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Inventory refresher
//!
//! Pages through every region's desktop inventory and connection status
//! and rewrites the index, one full-replace record per desktop. Regions
//! that cannot be reached are skipped, not fatal; the stored index is the
//! union of whatever was observable this pass.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use portal_api::WorkspaceRecord;
use vdi_api::Desktop;

use crate::context::ApiContext;
use crate::vdi::{VdiClient, VdiError};

/// One full refresh pass over all regions
pub async fn run(ctx: &ApiContext) -> Result<()> {
    let regions = resolve_regions(ctx).await;

    // Registration codes are cached for the duration of this pass only
    let mut reg_codes: HashMap<String, String> = HashMap::new();

    for region in &regions {
        tracing::info!(%region, "refreshing inventory");
        match refresh_region(ctx, region, &mut reg_codes).await {
            Ok(count) => tracing::info!(%region, count, "inventory refresh complete"),
            Err(error) if error.is_connect() => {
                tracing::warn!(%region, "could not connect to control-plane endpoint, skipping");
            }
            Err(error) => {
                tracing::error!(%error, %region, "failed to list desktops, skipping region");
            }
        }
    }

    Ok(())
}

/// The regions to scan: the configured list, or whatever the control plane
/// reports, or the default region if discovery fails.
async fn resolve_regions(ctx: &ApiContext) -> Vec<String> {
    if let Some(regions) = &ctx.config.regions {
        tracing::info!(regions = regions.join(","), "using configured region list");
        return regions.clone();
    }

    let discovered = match ctx.vdi_client(&ctx.config.default_region) {
        Ok(client) => client.regions().await.map(|regions| {
            regions.into_iter().map(|r| r.name).collect::<Vec<_>>()
        }),
        Err(error) => Err(error),
    };

    match discovered {
        Ok(regions) if !regions.is_empty() => {
            tracing::info!(regions = regions.join(","), "discovered regions");
            regions
        }
        Ok(_) => {
            tracing::warn!("control plane reported no regions, using the default region");
            vec![ctx.config.default_region.clone()]
        }
        Err(error) => {
            tracing::error!(%error, "unable to get a list of regions, using the default region");
            vec![ctx.config.default_region.clone()]
        }
    }
}

async fn refresh_region(
    ctx: &ApiContext,
    region: &str,
    reg_codes: &mut HashMap<String, String>,
) -> Result<usize, VdiError> {
    let client = ctx.vdi_client(region)?;

    // Accumulate the region's full inventory first
    let mut desktops: Vec<Desktop> = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = client
            .desktops_page(page_token.as_deref(), ctx.config.desktop_page_size)
            .await?;
        desktops.extend(page.desktops);
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    if desktops.is_empty() {
        tracing::info!(region, "no desktop instances found");
        return Ok(0);
    }

    // Connection details for the whole region at once; cheaper than asking
    // per desktop
    let mut last_connected: HashMap<String, u64> = HashMap::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = client.connection_status_page(page_token.as_deref()).await?;
        for status in page.statuses {
            if let Some(ts) = status.last_known_connection {
                last_connected.insert(status.desktop_id, ts);
            }
        }
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    let now = epoch_seconds();
    let count = desktops.len();
    for desktop in desktops {
        let reg_code =
            registration_code(&client, region, reg_codes, &desktop.directory_id).await;
        let record = WorkspaceRecord {
            last_connected: last_connected.get(&desktop.desktop_id).copied(),
            instance_id: desktop.desktop_id,
            user_name: desktop.user_name,
            region: region.to_string(),
            instance_state: desktop.state,
            running_mode: desktop.running_mode,
            last_touched: now,
            reg_code,
            computer_name: desktop.computer_name,
            ip_address: desktop.ip_address,
        };

        tracing::debug!(instance_id = %record.instance_id, "upserting record");
        if let Err(error) = ctx.index.put(&record).await {
            tracing::error!(%error, instance_id = %record.instance_id, "index write failed");
        }
    }

    Ok(count)
}

/// Resolve a directory's registration code through the pass-scoped cache,
/// listing the region's directories on first miss.
async fn registration_code(
    client: &VdiClient,
    region: &str,
    cache: &mut HashMap<String, String>,
    directory_id: &str,
) -> Option<String> {
    if let Some(code) = cache.get(directory_id) {
        return Some(code.clone());
    }

    match client.directories().await {
        Ok(directories) => {
            for dir in directories {
                cache.insert(dir.directory_id, dir.registration_code);
            }
        }
        Err(error) => {
            tracing::error!(%error, region, "did not get list of directories");
            return None;
        }
    }

    let code = cache.get(directory_id).cloned();
    if code.is_none() {
        tracing::warn!(directory_id, region, "directory has no registration code");
    }
    code
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
