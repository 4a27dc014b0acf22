// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! VDI control-plane client
//!
//! Hand-written reqwest client over the `vdi-api` wire types. The control
//! plane is regional: one client per (invocation, region), with the base
//! URL derived from an endpoint template carrying a `{region}` placeholder.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use vdi_api::{
    BatchActionRequest, BatchActionResponse, ConnectionStatusResponse, Desktop,
    DesktopListResponse, DirectoryInfo, DirectoryListResponse, RegionInfo, RegionListResponse,
};

/// Control-plane client errors
#[derive(Debug, Error)]
pub enum VdiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("control plane returned {0}")]
    Status(reqwest::StatusCode),
}

impl VdiError {
    /// True when the regional endpoint could not be reached at all, as
    /// opposed to answering badly. The refresher downgrades these to a
    /// skip-with-warning.
    pub fn is_connect(&self) -> bool {
        match self {
            VdiError::Http(e) => e.is_connect() || e.is_timeout(),
            VdiError::Status(_) => false,
        }
    }
}

/// The five batch lifecycle operations the control plane accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    Start,
    Stop,
    Reboot,
    Rebuild,
    Terminate,
}

impl LifecycleOp {
    fn path_segment(&self) -> &'static str {
        match self {
            LifecycleOp::Start => "start",
            LifecycleOp::Stop => "stop",
            LifecycleOp::Reboot => "reboot",
            LifecycleOp::Rebuild => "rebuild",
            LifecycleOp::Terminate => "terminate",
        }
    }
}

/// Client for one region's control-plane endpoint
pub struct VdiClient {
    client: Client,
    base_url: String,
}

impl VdiClient {
    /// Create a client for the given region. The endpoint template may be a
    /// plain base URL (tests) or carry a `{region}` placeholder.
    pub fn for_region(endpoint_template: &str, region: &str, timeout_secs: u64) -> Result<Self, VdiError> {
        let base_url = endpoint_template
            .replace("{region}", region)
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, VdiError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VdiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, VdiError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VdiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// One page of the region's desktop inventory
    pub async fn desktops_page(
        &self,
        page_token: Option<&str>,
        limit: u32,
    ) -> Result<DesktopListResponse, VdiError> {
        let limit = limit.to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get_json("/v1/desktops", &query).await
    }

    /// Look up a single desktop by id; an unknown id yields an empty list
    pub async fn describe_desktop(&self, desktop_id: &str) -> Result<Vec<Desktop>, VdiError> {
        let response: DesktopListResponse =
            self.get_json("/v1/desktops", &[("desktopId", desktop_id)]).await?;
        Ok(response.desktops)
    }

    /// One page of last-known connection times
    pub async fn connection_status_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<ConnectionStatusResponse, VdiError> {
        let mut query = Vec::new();
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get_json("/v1/desktops/connection-status", &query).await
    }

    /// All directories registered in the region
    pub async fn directories(&self) -> Result<Vec<DirectoryInfo>, VdiError> {
        let response: DirectoryListResponse = self.get_json("/v1/directories", &[]).await?;
        Ok(response.directories)
    }

    /// All regions the control plane is available in
    pub async fn regions(&self) -> Result<Vec<RegionInfo>, VdiError> {
        let response: RegionListResponse = self.get_json("/v1/regions", &[]).await?;
        Ok(response.regions)
    }

    /// Submit a batch lifecycle operation. The call succeeding does not
    /// mean every desktop was accepted: per-desktop failures come back in
    /// `failed_requests`.
    pub async fn submit(
        &self,
        op: LifecycleOp,
        desktop_ids: &[String],
    ) -> Result<BatchActionResponse, VdiError> {
        let body = BatchActionRequest {
            desktop_ids: desktop_ids.to_vec(),
        };
        self.post_json(&format!("/v1/desktops/{}", op.path_segment()), &body)
            .await
    }
}
