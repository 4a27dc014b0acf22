// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Portal configuration

use anyhow::{Context, Result};

/// Default index table name
const DEFAULT_INDEX_TABLE: &str = "WorkspacesPortal";

/// Default region used when region discovery fails
const DEFAULT_REGION: &str = "us-east-1";

/// Group claim that grants privileged (admin) access
const DEFAULT_ADMIN_GROUP: &str = "AdminGroupMember";

/// Default HTTP timeout for control-plane and index calls (seconds)
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Default desktop page size for inventory listing
const DEFAULT_DESKTOP_PAGE_SIZE: u32 = 25;

/// Default interval between inventory refresh passes (seconds)
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 900;

/// Default interval between reaper passes (seconds)
const DEFAULT_REAP_INTERVAL_SECS: u64 = 3600;

/// Portal configuration
#[derive(Clone, Debug)]
pub struct PortalConfig {
    /// Base URL of the index KV service; in-memory index when unset
    pub index_url: Option<String>,
    /// Index table name
    pub index_table: String,
    /// Control-plane endpoint template; `{region}` is substituted
    pub vdi_endpoint: String,
    /// Explicit region list; regions are discovered dynamically when unset
    pub regions: Option<Vec<String>>,
    /// Region used for discovery and as the fallback when discovery fails
    pub default_region: String,
    /// Group membership token that grants privileged access
    pub admin_group: String,
    /// HTTP timeout for outbound calls
    pub http_timeout_secs: u64,
    /// Page size for desktop inventory listing
    pub desktop_page_size: u32,
    /// Seconds between inventory refresh passes
    pub refresh_interval_secs: u64,
    /// Seconds between reaper passes
    pub reap_interval_secs: u64,
}

impl PortalConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let vdi_endpoint =
            std::env::var("VDI_ENDPOINT").context("VDI_ENDPOINT is required (control-plane endpoint template)")?;

        let index_url = std::env::var("INDEX_URL").ok().filter(|s| !s.is_empty());

        let index_table =
            std::env::var("INDEX_TABLE").unwrap_or_else(|_| DEFAULT_INDEX_TABLE.to_string());

        let regions = std::env::var("REGION_LIST").ok().map(|list| {
            list.split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect::<Vec<_>>()
        });

        let default_region =
            std::env::var("DEFAULT_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());

        let admin_group =
            std::env::var("ADMIN_GROUP").unwrap_or_else(|_| DEFAULT_ADMIN_GROUP.to_string());

        let http_timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        let desktop_page_size = std::env::var("DESKTOP_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DESKTOP_PAGE_SIZE);

        let refresh_interval_secs = std::env::var("REFRESH_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);

        let reap_interval_secs = std::env::var("REAP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REAP_INTERVAL_SECS);

        Ok(Self {
            index_url,
            index_table,
            vdi_endpoint,
            regions,
            default_region,
            admin_group,
            http_timeout_secs,
            desktop_page_size,
            refresh_interval_secs,
            reap_interval_secs,
        })
    }

    /// Configuration for tests and local development: a fixed endpoint,
    /// one region, in-memory index.
    pub fn for_endpoint(vdi_endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            index_url: None,
            index_table: DEFAULT_INDEX_TABLE.to_string(),
            vdi_endpoint: vdi_endpoint.into(),
            regions: Some(vec![region.clone()]),
            default_region: region,
            admin_group: DEFAULT_ADMIN_GROUP.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            desktop_page_size: DEFAULT_DESKTOP_PAGE_SIZE,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            reap_interval_secs: DEFAULT_REAP_INTERVAL_SECS,
        }
    }
}
