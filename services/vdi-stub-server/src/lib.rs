// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Stub VDI control plane for testing
//!
//! This crate provides a Dropshot-based HTTP server that implements the
//! VDI control-plane API trait over in-memory state. It can be used for:
//!
//! - Integration testing of portal-service without real control-plane access
//! - Local development and demos
//!
//! One stub instance stands in for one regional endpoint. Tests seed
//! desktops, connection statuses, and directories directly; the standalone
//! binary loads a JSON fixture file at startup. Lifecycle endpoints record
//! every call in an action log (so tests can assert the portal did or did
//! not call out), honor injected per-desktop failures, and advance desktop
//! state the way the real control plane acknowledges requests.

use anyhow::{Context, Result};
use dropshot::{HttpError, HttpResponseOk, Query, RequestContext, TypedBody};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use vdi_api::{
    BatchActionRequest, BatchActionResponse, ConnectionStatus, ConnectionStatusQuery,
    ConnectionStatusResponse, Desktop, DesktopListQuery, DesktopListResponse, DesktopState,
    DirectoryInfo, DirectoryListResponse, FailedRequest, RegionInfo, RegionListResponse, VdiApi,
};

/// Default page size when a list request does not name one
const DEFAULT_PAGE_SIZE: usize = 25;

// ============================================================================
// Fixture Data Types
// ============================================================================

/// Fixture file layout: the wire types, straight from JSON
#[derive(Debug, Default, Deserialize)]
struct Fixtures {
    #[serde(default)]
    desktops: Vec<Desktop>,
    #[serde(default)]
    connections: Vec<ConnectionStatus>,
    #[serde(default)]
    directories: Vec<DirectoryInfo>,
    #[serde(default)]
    regions: Vec<RegionInfo>,
}

// ============================================================================
// Server Context
// ============================================================================

#[derive(Debug, Default)]
struct StubState {
    desktops: Vec<Desktop>,
    connections: Vec<ConnectionStatus>,
    directories: Vec<DirectoryInfo>,
    regions: Vec<RegionInfo>,
    /// Desktop ids whose next lifecycle request fails with this message
    failures: HashMap<String, String>,
    /// Every lifecycle call received, as "op desktop-id"
    actions: Vec<String>,
}

/// Context for the stub control plane, holding all test state
#[derive(Debug, Default)]
pub struct StubContext {
    state: Mutex<StubState>,
}

impl StubContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stub context from a JSON fixture file
    pub fn from_fixtures(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures file: {}", path.display()))?;
        let fixtures: Fixtures = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse fixtures file: {}", path.display()))?;

        tracing::info!(
            desktops = fixtures.desktops.len(),
            directories = fixtures.directories.len(),
            "loaded fixtures"
        );

        Ok(Self {
            state: Mutex::new(StubState {
                desktops: fixtures.desktops,
                connections: fixtures.connections,
                directories: fixtures.directories,
                regions: fixtures.regions,
                ..Default::default()
            }),
        })
    }

    fn locked(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ------------------------------------------------------------------
    // Seeding and assertion helpers
    // ------------------------------------------------------------------

    pub fn add_desktop(&self, desktop: Desktop) {
        self.locked().desktops.push(desktop);
    }

    pub fn add_connection(&self, desktop_id: &str, last_known_connection: Option<u64>) {
        self.locked().connections.push(ConnectionStatus {
            desktop_id: desktop_id.to_string(),
            last_known_connection,
        });
    }

    pub fn add_directory(&self, directory_id: &str, registration_code: &str) {
        self.locked().directories.push(DirectoryInfo {
            directory_id: directory_id.to_string(),
            registration_code: registration_code.to_string(),
        });
    }

    pub fn set_regions(&self, names: &[&str]) {
        self.locked().regions = names
            .iter()
            .map(|name| RegionInfo { name: name.to_string() })
            .collect();
    }

    /// Drop a desktop as if the control plane finished tearing it down
    pub fn remove_desktop(&self, desktop_id: &str) {
        self.locked().desktops.retain(|d| d.desktop_id != desktop_id);
    }

    /// Make lifecycle requests for this desktop come back as per-item
    /// failures with the given message
    pub fn inject_failure(&self, desktop_id: &str, message: &str) {
        self.locked()
            .failures
            .insert(desktop_id.to_string(), message.to_string());
    }

    pub fn desktop_state(&self, desktop_id: &str) -> Option<DesktopState> {
        self.locked()
            .desktops
            .iter()
            .find(|d| d.desktop_id == desktop_id)
            .map(|d| d.state)
    }

    pub fn desktop_count(&self) -> usize {
        self.locked().desktops.len()
    }

    /// Every lifecycle call received so far, as "op desktop-id" strings
    pub fn actions(&self) -> Vec<String> {
        self.locked().actions.clone()
    }
}

// ============================================================================
// API Implementation
// ============================================================================

/// What a lifecycle operation does to an accepted desktop
enum ActionEffect {
    SetState(DesktopState),
    Remove,
}

fn apply_lifecycle(
    ctx: &StubContext,
    op: &'static str,
    effect: ActionEffect,
    request: BatchActionRequest,
) -> BatchActionResponse {
    let mut state = ctx.locked();
    let mut failed_requests = Vec::new();
    let mut removals: Vec<String> = Vec::new();

    for desktop_id in request.desktop_ids {
        state.actions.push(format!("{} {}", op, desktop_id));

        if let Some(message) = state.failures.get(&desktop_id) {
            failed_requests.push(FailedRequest {
                desktop_id: desktop_id.clone(),
                error_code: Some("OperationFailed".to_string()),
                error_message: message.clone(),
            });
            continue;
        }

        match state.desktops.iter_mut().find(|d| d.desktop_id == desktop_id) {
            None => failed_requests.push(FailedRequest {
                desktop_id: desktop_id.clone(),
                error_code: Some("ResourceNotFound".to_string()),
                error_message: format!("Desktop {} does not exist.", desktop_id),
            }),
            Some(desktop) => match effect {
                ActionEffect::SetState(next) => desktop.state = next,
                ActionEffect::Remove => removals.push(desktop_id.clone()),
            },
        }
    }

    state.desktops.retain(|d| !removals.contains(&d.desktop_id));

    BatchActionResponse { failed_requests }
}

fn page_bounds(token: Option<&str>, limit: usize, len: usize) -> (usize, usize) {
    let start = token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0).min(len);
    (start, (start + limit.max(1)).min(len))
}

/// Marker type for the stub VDI API implementation
pub enum StubVdiApi {}

impl VdiApi for StubVdiApi {
    type Context = Arc<StubContext>;

    async fn list_desktops(
        rqctx: RequestContext<Self::Context>,
        query: Query<DesktopListQuery>,
    ) -> Result<HttpResponseOk<DesktopListResponse>, HttpError> {
        let ctx = rqctx.context();
        let query = query.into_inner();
        let state = ctx.locked();

        // Id lookup: one matching desktop or an empty page, never an error
        if let Some(desktop_id) = &query.desktop_id {
            let desktops: Vec<Desktop> = state
                .desktops
                .iter()
                .filter(|d| &d.desktop_id == desktop_id)
                .cloned()
                .collect();
            return Ok(HttpResponseOk(DesktopListResponse {
                desktops,
                next_page_token: None,
            }));
        }

        let limit = query.limit.map(|l| l as usize).unwrap_or(DEFAULT_PAGE_SIZE);
        let (start, end) = page_bounds(query.page_token.as_deref(), limit, state.desktops.len());
        let next_page_token = (end < state.desktops.len()).then(|| end.to_string());

        Ok(HttpResponseOk(DesktopListResponse {
            desktops: state.desktops[start..end].to_vec(),
            next_page_token,
        }))
    }

    async fn list_connection_status(
        rqctx: RequestContext<Self::Context>,
        query: Query<ConnectionStatusQuery>,
    ) -> Result<HttpResponseOk<ConnectionStatusResponse>, HttpError> {
        let ctx = rqctx.context();
        let query = query.into_inner();
        let state = ctx.locked();

        let (start, end) =
            page_bounds(query.page_token.as_deref(), DEFAULT_PAGE_SIZE, state.connections.len());
        let next_page_token = (end < state.connections.len()).then(|| end.to_string());

        Ok(HttpResponseOk(ConnectionStatusResponse {
            statuses: state.connections[start..end].to_vec(),
            next_page_token,
        }))
    }

    async fn list_directories(
        rqctx: RequestContext<Self::Context>,
    ) -> Result<HttpResponseOk<DirectoryListResponse>, HttpError> {
        let ctx = rqctx.context();
        Ok(HttpResponseOk(DirectoryListResponse {
            directories: ctx.locked().directories.clone(),
        }))
    }

    async fn list_regions(
        rqctx: RequestContext<Self::Context>,
    ) -> Result<HttpResponseOk<RegionListResponse>, HttpError> {
        let ctx = rqctx.context();
        Ok(HttpResponseOk(RegionListResponse {
            regions: ctx.locked().regions.clone(),
        }))
    }

    async fn start_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError> {
        Ok(HttpResponseOk(apply_lifecycle(
            rqctx.context(),
            "start",
            ActionEffect::SetState(DesktopState::Starting),
            body.into_inner(),
        )))
    }

    async fn stop_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError> {
        Ok(HttpResponseOk(apply_lifecycle(
            rqctx.context(),
            "stop",
            ActionEffect::SetState(DesktopState::Stopping),
            body.into_inner(),
        )))
    }

    async fn reboot_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError> {
        Ok(HttpResponseOk(apply_lifecycle(
            rqctx.context(),
            "reboot",
            ActionEffect::SetState(DesktopState::Rebooting),
            body.into_inner(),
        )))
    }

    async fn rebuild_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError> {
        Ok(HttpResponseOk(apply_lifecycle(
            rqctx.context(),
            "rebuild",
            ActionEffect::SetState(DesktopState::Rebuilding),
            body.into_inner(),
        )))
    }

    async fn terminate_desktops(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<BatchActionRequest>,
    ) -> Result<HttpResponseOk<BatchActionResponse>, HttpError> {
        Ok(HttpResponseOk(apply_lifecycle(
            rqctx.context(),
            "terminate",
            ActionEffect::Remove,
            body.into_inner(),
        )))
    }
}

/// Create the Dropshot API description for the stub server
pub fn api_description() -> Result<dropshot::ApiDescription<Arc<StubContext>>, String> {
    vdi_api::vdi_api_mod::api_description::<StubVdiApi>().map_err(|e| e.to_string())
}

// ============================================================================
// Tests
// ============================================================================
