// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! API context for the portal service

use std::sync::Arc;

use anyhow::Result;

use crate::config::PortalConfig;
use crate::index::{HttpIndex, MemIndex, WorkspaceIndex};
use crate::vdi::{VdiClient, VdiError};

/// Context shared by the request handlers and the background jobs
pub struct ApiContext {
    pub config: PortalConfig,
    pub index: Arc<dyn WorkspaceIndex>,
}

impl ApiContext {
    /// Create a new API context. The index backend is chosen by
    /// configuration: the HTTP KV service when `INDEX_URL` is set, the
    /// in-memory index otherwise.
    pub fn new(config: PortalConfig) -> Result<Self> {
        let index: Arc<dyn WorkspaceIndex> = match &config.index_url {
            Some(url) => Arc::new(HttpIndex::new(
                url.clone(),
                config.index_table.clone(),
                config.http_timeout_secs,
            )?),
            None => {
                tracing::warn!("INDEX_URL not set, using in-memory index (records are not persisted)");
                Arc::new(MemIndex::new())
            }
        };

        Ok(Self { config, index })
    }

    /// Context over an existing index handle (tests)
    pub fn with_index(config: PortalConfig, index: Arc<dyn WorkspaceIndex>) -> Self {
        Self { config, index }
    }

    /// A fresh control-plane client for one region. Clients are
    /// invocation-scoped: each handler call and each job pass constructs
    /// its own.
    pub fn vdi_client(&self, region: &str) -> Result<VdiClient, VdiError> {
        VdiClient::for_region(&self.config.vdi_endpoint, region, self.config.http_timeout_secs)
    }
}
