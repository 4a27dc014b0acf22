// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Desktop Portal Service Library
//!
//! The portal lets end users manage their assigned virtual desktop
//! instances over a web-facing API backed by a side-table index of
//! instance metadata. It:
//!
//! - Validates and forwards lifecycle actions (start, stop, reboot,
//!   rebuild, decommission) to the VDI control plane, gated by a
//!   state-compatibility table and group-based authorization
//! - Periodically rewrites the index from the live per-region inventory
//! - Lists the index filtered by ownership (or in full, for admins)
//! - Reaps index records for desktops the control plane no longer reports
//!
//! # Modules
//!
//! - [`claims`] - bearer-token claims extraction
//! - [`config`] - environment configuration
//! - [`context`] - API context for request handlers and jobs
//! - [`gate`] - the action/state transition table and authorization checks
//! - [`index`] - the workspace index seam (HTTP and in-memory backends)
//! - [`jobs`] - the refresher and reaper background passes
//! - [`vdi`] - the regional control-plane client

pub mod claims;
pub mod config;
pub mod context;
pub mod gate;
pub mod index;
pub mod jobs;
pub mod vdi;

use std::sync::Arc;

use dropshot::{Body, HttpError, Query, RequestContext};
use http::Response;
use portal_api::{ActionQuery, ListQuery, PortalApi, PortalBody, WorkspaceAction};

use crate::context::ApiContext;
use crate::gate::Transition;
use crate::vdi::LifecycleOp;

/// Desktop Portal API implementation
///
/// This enum serves as the implementation type for the `PortalApi` trait.
/// It contains no data - all state is stored in the `ApiContext`.
pub enum PortalServiceImpl {}

/// Build the uniform portal response: HTTP 200, permissive CORS, and the
/// outcome in the JSON body.
fn reply(body: PortalBody) -> Result<Response<Body>, HttpError> {
    let json = serde_json::to_string(&body)
        .map_err(|e| HttpError::for_internal_error(format!("failed to serialize body: {}", e)))?;

    Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(json.into())
        .map_err(|e| HttpError::for_internal_error(format!("failed to build response: {}", e)))
}

fn error_reply(message: impl Into<String>) -> Result<Response<Body>, HttpError> {
    reply(PortalBody::Error(message.into()))
}

/// The control-plane operation backing each portal action
fn provider_op(action: WorkspaceAction) -> LifecycleOp {
    match action {
        WorkspaceAction::Start => LifecycleOp::Start,
        WorkspaceAction::Stop => LifecycleOp::Stop,
        WorkspaceAction::Reboot => LifecycleOp::Reboot,
        WorkspaceAction::Rebuild => LifecycleOp::Rebuild,
        WorkspaceAction::Decommission => LifecycleOp::Terminate,
    }
}

impl PortalApi for PortalServiceImpl {
    type Context = Arc<ApiContext>;

    async fn dispatch_action(
        rqctx: RequestContext<Self::Context>,
        query: Query<ActionQuery>,
    ) -> Result<Response<Body>, HttpError> {
        let ctx = rqctx.context();
        let query = query.into_inner();

        let Some(token) = rqctx
            .request
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        else {
            tracing::error!("no authorization header supplied");
            return error_reply("No authorization header supplied.");
        };

        let claims = claims::decode(token);
        let Some(username) = claims.username() else {
            tracing::error!("no identity information in token claims");
            return error_reply("No identity information in authorization.");
        };
        if claims.groups().is_none() {
            tracing::error!("no group information in token claims");
            return error_reply("No group information in authorization.");
        }

        let Some(instance_id) = query.instance_id.as_deref() else {
            tracing::error!("no instance id specified");
            return error_reply("No instance id specified in request.");
        };
        let Some(action_name) = query.action.as_deref() else {
            tracing::error!("no action specified");
            return error_reply("No action specified in request.");
        };
        let Some(action) = WorkspaceAction::parse(action_name) else {
            tracing::error!(action = action_name, "invalid action specified");
            return error_reply("Invalid action specified in request.");
        };

        // Decommission is admin-only; checked before touching the index
        if let Err(message) =
            gate::require_decommission_rights(action, &claims, &ctx.config.admin_group)
        {
            tracing::error!(username, "user not authorised to decommission instance");
            return error_reply(message);
        }

        let record = match ctx.index.get(instance_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::error!(instance_id, "instance not found in index");
                return error_reply("Instance not found in database.");
            }
            Err(error) => {
                tracing::error!(%error, instance_id, "index read failed");
                return error_reply("Database query error.");
            }
        };

        if let Err(message) =
            gate::require_ownership(&claims, username, &record.user_name, &ctx.config.admin_group)
        {
            tracing::error!(
                username,
                owner = %record.user_name,
                instance_id,
                "user not authorised to act on another user's instance"
            );
            return error_reply(message);
        }

        let next_state = match gate::transition(action, record.instance_state) {
            Transition::Allow(next_state) => next_state,
            Transition::Deny(message) => {
                tracing::warn!(
                    instance_id,
                    %action,
                    state = %record.instance_state,
                    "action not legal from current state"
                );
                return reply(PortalBody::Warning(message.to_string()));
            }
        };

        let client = match ctx.vdi_client(&record.region) {
            Ok(client) => client,
            Err(error) => {
                tracing::error!(%error, region = %record.region, "could not build control-plane client");
                return error_reply(format!(
                    "Workspaces API query error for {}.",
                    action.as_str().to_lowercase()
                ));
            }
        };

        let outcome = match client
            .submit(provider_op(action), &[instance_id.to_string()])
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(%error, instance_id, %action, "control-plane call failed");
                return error_reply(format!(
                    "Workspaces API query error for {}.",
                    action.as_str().to_lowercase()
                ));
            }
        };

        if let Some(failed) = outcome.failed_requests.first() {
            tracing::error!(
                instance_id,
                message = %failed.error_message,
                "control plane rejected the request"
            );
            return error_reply(format!("Action failed: {}", failed.error_message));
        }

        // The call is acknowledged; the caller sees success even if this
        // write fails, and the next refresh pass corrects the index.
        if let Err(error) = ctx.index.set_state(instance_id, next_state).await {
            tracing::error!(%error, instance_id, "could not update index after action");
        }

        reply(PortalBody::Success(format!(
            "Workspaces {} in progress for {}.",
            action, instance_id
        )))
    }

    async fn list_workspaces(
        rqctx: RequestContext<Self::Context>,
        query: Query<ListQuery>,
    ) -> Result<Response<Body>, HttpError> {
        let ctx = rqctx.context();
        let query = query.into_inner();

        let Some(token) = rqctx
            .request
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        else {
            tracing::error!("no authorization header supplied");
            return error_reply("No authorization header supplied.");
        };

        let claims = claims::decode(token);
        let Some(username) = claims.username() else {
            tracing::error!("no identity information in token claims");
            return error_reply("No identity information in authorization.");
        };
        if claims.groups().is_none() {
            tracing::error!("no group information in token claims");
            return error_reply("No group information in authorization.");
        }

        // ListAll is honored on presence, for admins only; everyone else
        // silently gets their own list
        let list_all = query.list_all.is_some() && claims.is_member(&ctx.config.admin_group);
        tracing::info!(username, list_all, "listing workspaces");

        let mut workspaces = Vec::new();
        let mut start_key: Option<String> = None;
        loop {
            let page = match ctx.index.scan(start_key.as_deref()).await {
                Ok(page) => page,
                Err(error) => {
                    tracing::error!(%error, "index scan failed");
                    return error_reply("Index scan error.");
                }
            };

            for record in page.records {
                if list_all || record.user_name.eq_ignore_ascii_case(username) {
                    workspaces.push(record);
                }
            }

            match page.next_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        reply(PortalBody::Workspaces(workspaces))
    }
}
