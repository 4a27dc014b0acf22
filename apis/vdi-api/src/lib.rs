// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! VDI Control-Plane API Trait Definition
//!
//! **IMPORTANT**: This trait defines a *subset* of the vendor's virtual
//! desktop control-plane API. It is NOT a complete definition - it only
//! includes the endpoints the desktop portal depends on: enumerating
//! desktops and their connection status, resolving directory registration
//! codes, region discovery, and the batch lifecycle operations.
//!
//! The actual implementation of these endpoints lives on the vendor's
//! regional endpoints. This trait exists to:
//! 1. Document the exact control-plane surface we depend on
//! 2. Enable the in-memory stub implementation for testing
//!
//! Each region is a separate endpoint; callers construct one client per
//! region and the paths below are relative to that regional base URL.

use dropshot::{HttpError, HttpResponseOk, Query, RequestContext, TypedBody};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Wire Types
// ============================================================================

/// Desktop instance state as reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesktopState {
    Available,
    Stopped,
    Starting,
    Stopping,
    Rebooting,
    Rebuilding,
    Impaired,
    Unhealthy,
    Inoperable,
    Error,
    Suspended,
}

impl DesktopState {
    /// Returns the state's wire spelling (e.g. "AVAILABLE")
    pub fn as_str(&self) -> &'static str {
        match self {
            DesktopState::Available => "AVAILABLE",
            DesktopState::Stopped => "STOPPED",
            DesktopState::Starting => "STARTING",
            DesktopState::Stopping => "STOPPING",
            DesktopState::Rebooting => "REBOOTING",
            DesktopState::Rebuilding => "REBUILDING",
            DesktopState::Impaired => "IMPAIRED",
            DesktopState::Unhealthy => "UNHEALTHY",
            DesktopState::Inoperable => "INOPERABLE",
            DesktopState::Error => "ERROR",
            DesktopState::Suspended => "SUSPENDED",
        }
    }
}

impl fmt::Display for DesktopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desktop running mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunningMode {
    AlwaysOn,
    AutoStop,
}

/// A desktop instance as reported by the control plane
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Desktop {
    /// Desktop instance id (e.g. "ws-9f2k81m4q")
    pub desktop_id: String,
    /// Directory user the desktop is assigned to
    pub user_name: String,
    /// Current state
    pub state: DesktopState,
    /// Running mode
    pub running_mode: RunningMode,
    /// Directory the desktop is registered in
    pub directory_id: String,
    /// Directory computer object name, once joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    /// Primary IP address, once assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Last-known client connection info for a desktop
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Desktop instance id
    pub desktop_id: String,
    /// Epoch seconds of the last known user connection, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_connection: Option<u64>,
}

/// A desktop directory and its client registration code
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryInfo {
    /// Directory id (e.g. "d-90671ab2c4")
    pub directory_id: String,
    /// Registration code clients use to pair with this directory
    pub registration_code: String,
}

/// A region the control plane is available in
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegionInfo {
    /// Region name (e.g. "us-east-1")
    pub name: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for the desktop list endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DesktopListQuery {
    /// Return only the desktop with this id
    #[serde(rename = "desktopId")]
    pub desktop_id: Option<String>,

    /// Maximum number of desktops per page (default: 25)
    pub limit: Option<u32>,

    /// Token for cursor-based pagination (returned from a previous page)
    #[serde(rename = "pageToken")]
    pub page_token: Option<String>,
}

/// One page of desktops
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DesktopListResponse {
    /// Desktops in this page
    pub desktops: Vec<Desktop>,

    /// Token for fetching the next page (absent on the last page)
    #[serde(rename = "nextPageToken", default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Query parameters for the connection-status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConnectionStatusQuery {
    /// Token for cursor-based pagination
    #[serde(rename = "pageToken")]
    pub page_token: Option<String>,
}

/// One page of connection statuses
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConnectionStatusResponse {
    /// Connection statuses in this page
    pub statuses: Vec<ConnectionStatus>,

    /// Token for fetching the next page (absent on the last page)
    #[serde(rename = "nextPageToken", default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// All directories registered in the region
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DirectoryListResponse {
    pub directories: Vec<DirectoryInfo>,
}

/// All regions the control plane is available in
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegionListResponse {
    pub regions: Vec<RegionInfo>,
}

/// A batch lifecycle request naming the target desktops
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchActionRequest {
    /// Desktop ids the operation applies to
    pub desktop_ids: Vec<String>,
}

/// A desktop the control plane declined to act on
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailedRequest {
    /// Desktop id the failure applies to
    pub desktop_id: String,
    /// Machine-readable failure code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable failure message
    pub error_message: String,
}

/// Outcome of a batch lifecycle request
///
/// The call as a whole succeeds even when individual desktops fail;
/// per-desktop failures are reported here.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchActionResponse {
    /// Desktops the operation was not accepted for
    #[serde(default)]
    pub failed_requests: Vec<FailedRequest>,
}

// ============================================================================
// API Trait
// ============================================================================

/// VDI Control-Plane API (Subset)
///
/// **IMPORTANT**: This is a partial definition of the vendor's control-plane
/// API, containing only the endpoints used by the desktop portal. The actual
/// implementation is provided by the vendor's regional endpoints, not by us;
/// we define this trait so the stub server and tests can implement it.
#[dropshot::api_description]
pub trait VdiApi {
    /// Context type for request handlers
    type Context: Send + Sync + 'static;

    /// List desktops in the region
    ///
    /// Cursor-paged. Pass `desktopId` to look up a single desktop; an
    /// unknown id yields an empty page, not an error.
    #[endpoint {
        method = GET,
        path = "/v1/desktops",
        tags = ["desktops"],
    }]
    async fn list_desktops(
        rqctx: RequestContext<Self::Context>,
        query: Query<DesktopListQuery>,
    ) -> Result<HttpResponseOk<DesktopListResponse>, HttpError>;

    /// List last-known client connection times for all desktops in the region
    #[endpoint {
        method = GET,
        path = "/v1/desktops/connection-status",
        tags = ["desktops"],
    }]
    async fn list_connection_status(
        rqctx: RequestContext<Self::Context>,
        query: Query<ConnectionStatusQuery>,
    ) -> Result<HttpResponseOk<ConnectionStatusResponse>, HttpError>;

    /// List directories registered in the region
    #[endpoint {
        method = GET,
        path = "/v1/directories",
        tags = ["directories"],
    }]
    async fn list_directories(
        rqctx: RequestContext<Self::Context>,
    ) -> Result<HttpResponseOk<DirectoryListResponse>, HttpError>;

    /// List all regions the control plane is available in
    #[endpoint {
        method = GET,
        path = "/v1/regions",
        tags = ["regions"],
    }]
    async fn list_regions(
        rqctx: RequestContext<Self::Context>,
    ) -> Result<HttpResponseOk<RegionListResponse>, HttpError>;

    /// Start stopped desktops
    #[endpoint {
        method = POST,
        path = "/v1/desktops/start",
        tags = ["lifecycle"],
    }]
    async fn start_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError>;

    /// Stop running desktops
    #[endpoint {
        method = POST,
        path = "/v1/desktops/stop",
        tags = ["lifecycle"],
    }]
    async fn stop_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError>;

    /// Reboot desktops
    #[endpoint {
        method = POST,
        path = "/v1/desktops/reboot",
        tags = ["lifecycle"],
    }]
    async fn reboot_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError>;

    /// Rebuild desktops from their base image
    #[endpoint {
        method = POST,
        path = "/v1/desktops/rebuild",
        tags = ["lifecycle"],
    }]
    async fn rebuild_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError>;

    /// Terminate desktops
    ///
    /// Terminated desktops stop appearing in `list_desktops` once the
    /// control plane finishes tearing them down.
    #[endpoint {
        method = POST,
        path = "/v1/desktops/terminate",
        tags = ["lifecycle"],
    }]
    async fn terminate_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError>;
}
