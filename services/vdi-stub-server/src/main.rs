// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Standalone stub VDI control plane for testing and development
//!
//! Run with:
//! ```bash
//! cargo run -p vdi-stub-server
//! ```
//!
//! Then point portal-service at it:
//! ```bash
//! VDI_ENDPOINT=http://localhost:9191 REGION_LIST=us-east-1 cargo run -p portal-service
//! ```

use anyhow::Result;
use dropshot::{ConfigDropshot, ConfigLogging, ConfigLoggingLevel, HttpServerStarter};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use vdi_stub_server::{StubContext, api_description};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let log_config = ConfigLogging::StderrTerminal {
        level: ConfigLoggingLevel::Info,
    };
    let log = log_config.to_logger("vdi-stub-server")?;

    // Load fixture data
    let fixtures_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("desktops.json");
    let context = Arc::new(StubContext::from_fixtures(&fixtures_path)?);

    tracing::info!("Serving {} desktops", context.desktop_count());

    // Configure the server
    let config = ConfigDropshot {
        bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 9191)),
        default_request_body_max_bytes: 1024 * 1024,
        default_handler_task_mode: dropshot::HandlerTaskMode::Detached,
        ..Default::default()
    };

    // Create and start the server
    let api = api_description().map_err(|e| anyhow::anyhow!(e))?;
    let server = HttpServerStarter::new(&config, api, context, &log)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?
        .start();

    tracing::info!("Stub VDI control plane listening on http://localhost:9191");
    tracing::info!("Available endpoints:");
    tracing::info!("  GET  /v1/desktops");
    tracing::info!("  GET  /v1/desktops/connection-status");
    tracing::info!("  GET  /v1/directories");
    tracing::info!("  GET  /v1/regions");
    tracing::info!("  POST /v1/desktops/{{start,stop,reboot,rebuild,terminate}}");

    server
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
