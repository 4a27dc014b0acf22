// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Desktop Portal API Trait Definition
//!
//! The portal fronts a web UI, so the response contract is deliberately
//! lenient: every endpoint answers HTTP 200 with a permissive CORS header,
//! and the outcome is carried in the body as exactly one of `Success`,
//! `Error`, or `Warning` (plus `Workspaces` for the listing endpoint).
//! Request parameters are all optional at the type level and validated by
//! the handlers, so a malformed request still gets a 200 with an `Error`
//! body rather than a framework-generated 4xx.

use dropshot::{Body, HttpError, Query, RequestContext};
use http::Response;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use vdi_api::{DesktopState, RunningMode};

// ============================================================================
// Record Types
// ============================================================================

/// One index record per desktop instance, keyed by `InstanceId`.
///
/// The PascalCase field names are the stored layout and the wire format the
/// web UI consumes; both numeric fields serialize as plain integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct WorkspaceRecord {
    /// Desktop instance id (primary key)
    pub instance_id: String,
    /// Owning user, as registered in the directory
    pub user_name: String,
    /// Region the instance lives in
    pub region: String,
    /// Last state observed (or last transition target issued)
    pub instance_state: DesktopState,
    /// Running mode
    pub running_mode: RunningMode,
    /// Epoch seconds of the last refresher pass that touched this record
    pub last_touched: u64,
    /// Directory registration code, when resolvable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_code: Option<String>,
    /// Directory computer object name, once joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    /// Primary IP address, once assigned
    #[serde(rename = "IPAddress", default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Epoch seconds of the last known user connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<u64>,
}

/// Lifecycle action a portal user can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum WorkspaceAction {
    Start,
    Stop,
    Reboot,
    Rebuild,
    Decommission,
}

impl WorkspaceAction {
    /// Parse the `Action` query parameter. Unknown spellings are `None`;
    /// the caller turns that into its own `Error` body.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Start" => Some(WorkspaceAction::Start),
            "Stop" => Some(WorkspaceAction::Stop),
            "Reboot" => Some(WorkspaceAction::Reboot),
            "Rebuild" => Some(WorkspaceAction::Rebuild),
            "Decommission" => Some(WorkspaceAction::Decommission),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceAction::Start => "Start",
            WorkspaceAction::Stop => "Stop",
            WorkspaceAction::Reboot => "Reboot",
            WorkspaceAction::Rebuild => "Rebuild",
            WorkspaceAction::Decommission => "Decommission",
        }
    }
}

impl fmt::Display for WorkspaceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for the action endpoint
///
/// Both parameters are required by the handler but optional here so their
/// absence produces an `Error` body instead of a dropshot 400.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ActionQuery {
    /// Target desktop instance id
    #[serde(rename = "InstanceId")]
    pub instance_id: Option<String>,
    /// Requested action (Start, Stop, Reboot, Rebuild, Decommission)
    #[serde(rename = "Action")]
    pub action: Option<String>,
}

/// Query parameters for the listing endpoint
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListQuery {
    /// When present and the caller is privileged, list every record
    /// instead of only the caller's own. The value is ignored.
    #[serde(rename = "ListAll")]
    pub list_all: Option<String>,
}

/// Response body envelope
///
/// Externally tagged, so the serialized form is `{"Success": "..."}`,
/// `{"Error": "..."}`, `{"Warning": "..."}`, or `{"Workspaces": [...]}`.
/// Warnings are expected user-facing guidance (an action not legal from the
/// instance's current state); Errors are denials and system faults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum PortalBody {
    Success(String),
    Error(String),
    Warning(String),
    Workspaces(Vec<WorkspaceRecord>),
}

// ============================================================================
// API Trait
// ============================================================================

/// Desktop Portal API
///
/// Both endpoints require a bearer `Authorization` header carrying the
/// caller's identity and group claims; the handlers extract those
/// themselves (signature verification is the fronting transport's job).
#[dropshot::api_description]
pub trait PortalApi {
    /// Context type for request handlers
    type Context: Send + Sync + 'static;

    /// Dispatch a lifecycle action against one desktop instance
    #[endpoint {
        method = GET,
        path = "/workspaces/action",
        tags = ["workspaces"],
    }]
    async fn dispatch_action(
        rqctx: RequestContext<Self::Context>,
        query: Query<ActionQuery>,
    ) -> Result<Response<Body>, HttpError>;

    /// List the caller's desktop instances (or all, for privileged callers)
    #[endpoint {
        method = GET,
        path = "/workspaces",
        tags = ["workspaces"],
    }]
    async fn list_workspaces(
        rqctx: RequestContext<Self::Context>,
        query: Query<ListQuery>,
    ) -> Result<Response<Body>, HttpError>;
}
