// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Integration tests for portal-service using vdi-stub-server
//!
//! These tests boot the stub control plane on an ephemeral port, mount the
//! portal API over an in-memory index, and drive the portal over real HTTP
//! the way the web UI does.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use portal_service::PortalServiceImpl;
use portal_service::config::PortalConfig;
use portal_service::context::ApiContext;
use portal_service::index::{MemIndex, WorkspaceIndex};
use portal_service::jobs;

use vdi_api::{Desktop, DesktopState, RunningMode};
use vdi_stub_server::StubContext;

/// Spin up the stub control plane on an ephemeral port
fn start_stub(
    context: Arc<StubContext>,
) -> (dropshot::HttpServer<Arc<StubContext>>, String) {
    let api = vdi_stub_server::api_description().expect("stub api description");

    let config = dropshot::ConfigDropshot {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        default_request_body_max_bytes: 1024 * 1024,
        default_handler_task_mode: dropshot::HandlerTaskMode::Detached,
        ..Default::default()
    };

    let log = dropshot::ConfigLogging::StderrTerminal {
        level: dropshot::ConfigLoggingLevel::Warn,
    }
    .to_logger("vdi-stub-test")
    .expect("stub logger");

    let server = dropshot::HttpServerStarter::new(&config, api, context, &log)
        .expect("start vdi stub")
        .start();

    let base_url = format!("http://{}", server.local_addr());
    (server, base_url)
}

/// Spin up the portal API over the given context
fn start_portal(
    context: Arc<ApiContext>,
) -> (dropshot::HttpServer<Arc<ApiContext>>, String) {
    let api = portal_api::portal_api_mod::api_description::<PortalServiceImpl>()
        .expect("portal api description");

    let config = dropshot::ConfigDropshot {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        default_request_body_max_bytes: 64 * 1024,
        default_handler_task_mode: dropshot::HandlerTaskMode::Detached,
        ..Default::default()
    };

    let log = dropshot::ConfigLogging::StderrTerminal {
        level: dropshot::ConfigLoggingLevel::Warn,
    }
    .to_logger("portal-test")
    .expect("portal logger");

    let server = dropshot::HttpServerStarter::new(&config, api, context, &log)
        .expect("start portal")
        .start();

    let base_url = format!("http://{}", server.local_addr());
    (server, base_url)
}

/// A bearer token with the given identity and group claims. The signature
/// is garbage; the portal only decodes the middle segment.
fn token(user_id: &str, groups: &str) -> String {
    let payload = serde_json::json!({
        "identities": [{"userId": user_id}],
        "custom:ADGroups": groups,
    });
    format!(
        "eyJhbGciOiJub25lIn0.{}.sig",
        URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes())
    )
}

fn desktop(id: &str, owner: &str, state: DesktopState, directory_id: &str) -> Desktop {
    Desktop {
        desktop_id: id.to_string(),
        user_name: owner.to_string(),
        state,
        running_mode: RunningMode::AutoStop,
        directory_id: directory_id.to_string(),
        computer_name: Some(format!("WSAMZN-{}", id.to_uppercase())),
        ip_address: Some("10.0.4.17".to_string()),
    }
}

/// Stub with three desktops across two owners plus carol's SUSPENDED one
fn seeded_stub() -> Arc<StubContext> {
    let stub = Arc::new(StubContext::new());
    stub.add_desktop(desktop(
        "ws-9f2k81m4q",
        "alice",
        DesktopState::Available,
        "d-90671ab2c4",
    ));
    stub.add_desktop(desktop(
        "ws-77abcddee",
        "bob",
        DesktopState::Stopped,
        "d-90671ab2c4",
    ));
    stub.add_desktop(Desktop {
        computer_name: None,
        ip_address: None,
        ..desktop("ws-p0q1r2s3t", "carol", DesktopState::Suspended, "d-1144aabbcc")
    });
    stub.add_connection("ws-9f2k81m4q", Some(1769990000));
    stub.add_directory("d-90671ab2c4", "WSpdx+R7TQ2D");
    stub.add_directory("d-1144aabbcc", "WSpdx+K2XN9F");
    stub.set_regions(&["us-east-1"]);
    stub
}

fn portal_over(stub_url: &str) -> (Arc<MemIndex>, Arc<ApiContext>) {
    let index = Arc::new(MemIndex::new());
    let config = PortalConfig::for_endpoint(stub_url, "us-east-1");
    let ctx = Arc::new(ApiContext::with_index(config, index.clone()));
    (index, ctx)
}

async fn get_body(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
) -> (reqwest::StatusCode, serde_json::Value) {
    let mut request = client.get(url);
    if let Some(token) = bearer {
        request = request.header("Authorization", token);
    }
    let response = request.send().await.expect("portal request");
    let status = response.status();
    let body = response.json().await.expect("json body");
    (status, body)
}

#[tokio::test]
async fn test_refresh_then_list_round_trip() {
    let stub = seeded_stub();
    let (_stub_server, stub_url) = start_stub(stub.clone());
    let (index, ctx) = portal_over(&stub_url);

    jobs::refresh::run(&ctx).await.expect("refresh pass");
    assert_eq!(index.len(), 3);

    // All observed fields make it into alice's record
    let record = index.get("ws-9f2k81m4q").await.unwrap().expect("alice's record");
    assert_eq!(record.user_name, "alice");
    assert_eq!(record.region, "us-east-1");
    assert_eq!(record.instance_state, DesktopState::Available);
    assert_eq!(record.reg_code.as_deref(), Some("WSpdx+R7TQ2D"));
    assert_eq!(record.computer_name.as_deref(), Some("WSAMZN-WS-9F2K81M4Q"));
    assert_eq!(record.last_connected, Some(1769990000));
    assert!(record.last_touched > 0);

    let (portal_server, portal_url) = start_portal(ctx);
    let client = reqwest::Client::new();

    // Owner listing: alice sees only her own record
    let (status, body) = get_body(
        &client,
        &format!("{}/workspaces", portal_url),
        Some(&token("CORP\\alice", "Users")),
    )
    .await;
    assert_eq!(status, 200);
    let workspaces = body["Workspaces"].as_array().expect("Workspaces array");
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0]["InstanceId"], "ws-9f2k81m4q");
    // Numeric fields serialize as integers, not strings
    assert!(workspaces[0]["LastTouched"].is_u64());
    assert!(workspaces[0]["LastConnected"].is_u64());

    // ListAll without the admin group silently degrades to the own list
    let (_, body) = get_body(
        &client,
        &format!("{}/workspaces?ListAll=True", portal_url),
        Some(&token("CORP\\alice", "Users")),
    )
    .await;
    assert_eq!(body["Workspaces"].as_array().unwrap().len(), 1);

    // Admins with ListAll see everything
    let (_, body) = get_body(
        &client,
        &format!("{}/workspaces?ListAll=True", portal_url),
        Some(&token("CORP\\root", "Users,AdminGroupMember")),
    )
    .await;
    assert_eq!(body["Workspaces"].as_array().unwrap().len(), 3);

    portal_server.close().await.expect("shutdown portal");
}

#[tokio::test]
async fn test_action_dispatch_gating() {
    let stub = seeded_stub();
    let (_stub_server, stub_url) = start_stub(stub.clone());
    let (index, ctx) = portal_over(&stub_url);

    jobs::refresh::run(&ctx).await.expect("refresh pass");

    let (portal_server, portal_url) = start_portal(ctx);
    let client = reqwest::Client::new();
    let alice = token("CORP\\alice", "Users");
    let admin = token("CORP\\root", "Users,AdminGroupMember");

    // Stop on an AVAILABLE instance the caller owns: control plane called,
    // record advanced to STOPPING, Success body
    let url = format!(
        "{}/workspaces/action?InstanceId=ws-9f2k81m4q&Action=Stop",
        portal_url
    );
    let response = client
        .get(&url)
        .header("Authorization", &alice)
        .send()
        .await
        .expect("stop request");
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("Access-Control-Allow-Origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(
        body["Success"],
        "Workspaces Stop in progress for ws-9f2k81m4q."
    );
    assert_eq!(stub.desktop_state("ws-9f2k81m4q"), Some(DesktopState::Stopping));
    let record = index.get("ws-9f2k81m4q").await.unwrap().unwrap();
    assert_eq!(record.instance_state, DesktopState::Stopping);
    assert_eq!(stub.actions(), vec!["stop ws-9f2k81m4q"]);

    // Decommission requires the admin group even on one's own instance;
    // no control-plane call is made
    let url = format!(
        "{}/workspaces/action?InstanceId=ws-9f2k81m4q&Action=Decommission",
        portal_url
    );
    let (_, body) = get_body(&client, &url, Some(&alice)).await;
    assert_eq!(body["Error"], "You are not authorised to decommission instances.");
    assert_eq!(stub.actions().len(), 1);

    // Acting on another user's instance without the admin group is denied
    let url = format!(
        "{}/workspaces/action?InstanceId=ws-77abcddee&Action=Start",
        portal_url
    );
    let (_, body) = get_body(&client, &url, Some(&alice)).await;
    assert_eq!(
        body["Error"],
        "You are not authorised to modify other users instances."
    );
    assert_eq!(stub.actions().len(), 1);

    // Decommission of a SUSPENDED instance warns, even for admins
    let url = format!(
        "{}/workspaces/action?InstanceId=ws-p0q1r2s3t&Action=Decommission",
        portal_url
    );
    let (_, body) = get_body(&client, &url, Some(&admin)).await;
    assert_eq!(
        body["Warning"],
        "You cannot decommission a Workspace when it is in a SUSPENDED state."
    );
    assert_eq!(stub.actions().len(), 1);

    // Start from a non-STOPPED state warns and does not call out
    let url = format!(
        "{}/workspaces/action?InstanceId=ws-p0q1r2s3t&Action=Start",
        portal_url
    );
    let (_, body) = get_body(&client, &url, Some(&admin)).await;
    assert_eq!(
        body["Warning"],
        "You cannot start a Workspace that is not in a STOPPED state."
    );
    assert_eq!(stub.actions().len(), 1);

    // A per-item control-plane failure surfaces as an Error and leaves the
    // record untouched
    stub.inject_failure("ws-77abcddee", "Maintenance window in progress");
    let url = format!(
        "{}/workspaces/action?InstanceId=ws-77abcddee&Action=Start",
        portal_url
    );
    let (_, body) = get_body(&client, &url, Some(&admin)).await;
    assert_eq!(body["Error"], "Action failed: Maintenance window in progress");
    let record = index.get("ws-77abcddee").await.unwrap().unwrap();
    assert_eq!(record.instance_state, DesktopState::Stopped);

    // Unknown instance id
    let url = format!(
        "{}/workspaces/action?InstanceId=ws-nope&Action=Stop",
        portal_url
    );
    let (_, body) = get_body(&client, &url, Some(&alice)).await;
    assert_eq!(body["Error"], "Instance not found in database.");

    // Unknown action spelling
    let url = format!(
        "{}/workspaces/action?InstanceId=ws-9f2k81m4q&Action=Obliterate",
        portal_url
    );
    let (_, body) = get_body(&client, &url, Some(&alice)).await;
    assert_eq!(body["Error"], "Invalid action specified in request.");

    portal_server.close().await.expect("shutdown portal");
}

#[tokio::test]
async fn test_reaper_removes_dead_records() {
    let stub = seeded_stub();
    let (_stub_server, stub_url) = start_stub(stub.clone());
    let (index, ctx) = portal_over(&stub_url);

    jobs::refresh::run(&ctx).await.expect("refresh pass");
    assert_eq!(index.len(), 3);

    // carol's desktop (no ComputerName) and bob's (with one) both disappear
    // from the control plane
    stub.remove_desktop("ws-p0q1r2s3t");
    stub.remove_desktop("ws-77abcddee");

    jobs::reap::run(&ctx).await.expect("reap pass");

    assert!(index.get("ws-p0q1r2s3t").await.unwrap().is_none());
    assert!(index.get("ws-77abcddee").await.unwrap().is_none());
    // The live record survives
    assert!(index.get("ws-9f2k81m4q").await.unwrap().is_some());
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn test_missing_or_malformed_auth() {
    let stub = seeded_stub();
    let (_stub_server, stub_url) = start_stub(stub.clone());
    let (_index, ctx) = portal_over(&stub_url);

    let (portal_server, portal_url) = start_portal(ctx);
    let client = reqwest::Client::new();

    // No Authorization header at all
    let (status, body) = get_body(&client, &format!("{}/workspaces", portal_url), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["Error"], "No authorization header supplied.");

    // A token that does not decode yields empty claims, which reads as
    // missing identity
    let (_, body) = get_body(
        &client,
        &format!("{}/workspaces", portal_url),
        Some("not-a-token"),
    )
    .await;
    assert_eq!(body["Error"], "No identity information in authorization.");

    // A decodable token without group claims
    let payload = serde_json::json!({"identities": [{"userId": "CORP\\alice"}]});
    let groupless = format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes()));
    let (_, body) = get_body(
        &client,
        &format!("{}/workspaces", portal_url),
        Some(&groupless),
    )
    .await;
    assert_eq!(body["Error"], "No group information in authorization.");

    // Missing query parameters on the action endpoint
    let alice = token("CORP\\alice", "Users");
    let (_, body) = get_body(
        &client,
        &format!("{}/workspaces/action", portal_url),
        Some(&alice),
    )
    .await;
    assert_eq!(body["Error"], "No instance id specified in request.");

    let (_, body) = get_body(
        &client,
        &format!("{}/workspaces/action?InstanceId=ws-9f2k81m4q", portal_url),
        Some(&alice),
    )
    .await;
    assert_eq!(body["Error"], "No action specified in request.");

    // Nothing ever reached the control plane
    assert!(stub.actions().is_empty());

    portal_server.close().await.expect("shutdown portal");
}
