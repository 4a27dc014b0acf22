// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Desktop Portal Service
//!
//! The portal service answers the web UI's workspace requests and keeps
//! the instance index in sync with the VDI control plane. It:
//!
//! - Serves the action and listing endpoints of the portal API
//! - Runs the inventory refresher on a fixed interval
//! - Runs the index reaper on a fixed interval

use std::sync::Arc;

use anyhow::{Context, Result};
use dropshot::{ConfigDropshot, ConfigLogging, ConfigLoggingLevel, HttpServerStarter};
use tracing::info;

use portal_service::PortalServiceImpl;
use portal_service::config::PortalConfig;
use portal_service::context::ApiContext;
use portal_service::jobs;

/// Default bind address for the HTTP server.
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8280";

/// Default maximum request body size (bytes). The portal only takes query
/// parameters, so this stays small.
const DEFAULT_BODY_MAX_BYTES: usize = 64 * 1024;

fn print_version() {
    let version = env!("CARGO_PKG_VERSION");
    let name = env!("CARGO_PKG_NAME");
    let buildstamp = option_env!("STAMP").unwrap_or("no-STAMP");
    println!("{} {} ({})", name, version, buildstamp);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --version and --help
    let args: Vec<String> = std::env::args().collect();
    #[allow(clippy::never_loop)] // Intentional: early return on first recognized arg
    for arg in &args[1..] {
        match arg.as_str() {
            "-V" | "--version" => {
                print_version();
                return Ok(());
            }
            "-h" | "--help" => {
                print_version();
                println!("Usage: {} [OPTIONS]", args[0]);
                println!();
                println!("Options:");
                println!("  -h, --help       Display this information");
                println!("  -V, --version    Display the program's version number");
                println!();
                println!("Environment variables:");
                println!(
                    "  BIND_ADDRESS          Server bind address (default: {})",
                    DEFAULT_BIND_ADDRESS
                );
                println!("  VDI_ENDPOINT          Control-plane endpoint template (required; {{region}} is substituted)");
                println!("  INDEX_URL             Index KV service base URL (in-memory index when unset)");
                println!("  INDEX_TABLE           Index table name (default: WorkspacesPortal)");
                println!("  REGION_LIST           Comma-separated regions (discovered dynamically when unset)");
                println!("  DEFAULT_REGION        Discovery/fallback region (default: us-east-1)");
                println!("  ADMIN_GROUP           Privileged group claim (default: AdminGroupMember)");
                println!("  REFRESH_INTERVAL_SECS Seconds between inventory refreshes (default: 900)");
                println!("  REAP_INTERVAL_SECS    Seconds between reaper passes (default: 3600)");
                println!(
                    "  RUST_LOG              Log filter (default: portal_service=info,dropshot=info)"
                );
                return Ok(());
            }
            _ => {
                eprintln!("Unknown option: {}", arg);
                std::process::exit(1);
            }
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "portal_service=info,dropshot=info".to_string()),
        ))
        .init();

    print_version();

    // Load configuration
    let config = PortalConfig::from_env().context("Failed to load configuration")?;
    info!("Control-plane endpoint template: {}", config.vdi_endpoint);
    info!("Index table: {}", config.index_table);

    // Create API context
    let api_context = Arc::new(ApiContext::new(config).context("Failed to create API context")?);

    // Start the refresher and reaper loops
    jobs::spawn(api_context.clone());

    // Get API description from the trait implementation
    let api = portal_api::portal_api_mod::api_description::<PortalServiceImpl>()
        .map_err(|e| anyhow::anyhow!("Failed to create API description: {}", e))?;

    // Configure the server
    let bind_address = std::env::var("BIND_ADDRESS")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string())
        .parse()
        .context("Invalid BIND_ADDRESS")?;

    let config_dropshot = ConfigDropshot {
        bind_address,
        default_request_body_max_bytes: DEFAULT_BODY_MAX_BYTES,
        default_handler_task_mode: dropshot::HandlerTaskMode::Detached,
        ..Default::default()
    };

    let config_logging = ConfigLogging::StderrTerminal {
        level: ConfigLoggingLevel::Info,
    };

    let log = config_logging
        .to_logger("portal-service")
        .map_err(|error| anyhow::anyhow!("failed to create logger: {}", error))?;

    // Start the server
    let server = HttpServerStarter::new(&config_dropshot, api, api_context, &log)
        .map_err(|error| anyhow::anyhow!("failed to create server: {}", error))?
        .start();

    info!("Desktop portal running on http://{}", bind_address);

    server
        .await
        .map_err(|error| anyhow::anyhow!("server failed: {}", error))
}
