// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The workspace index: a side table of one record per desktop instance
//!
//! The store itself is an external get/put/scan key-value service, so the
//! portal only sees the [`WorkspaceIndex`] trait. `HttpIndex` talks to the
//! real service; `MemIndex` backs tests and local development, with a small
//! page size so the scan-pagination loops are exercised for real.
//!
//! Per-key operations are atomic on the service side; there is no
//! cross-record transaction, and concurrent writers race benignly (last
//! write wins, corrected by the next refresh pass).

use async_trait::async_trait;
use portal_api::WorkspaceRecord;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use vdi_api::DesktopState;

/// Index service errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index service returned {0}")]
    Status(reqwest::StatusCode),
}

/// One page of a full-index scan
#[derive(Debug)]
pub struct ScanPage {
    pub records: Vec<WorkspaceRecord>,
    /// Pass back to `scan` to fetch the next page; `None` on the last page
    pub next_key: Option<String>,
}

/// The get/put/scan surface the portal needs from the index service
#[async_trait]
pub trait WorkspaceIndex: Send + Sync {
    async fn get(&self, instance_id: &str) -> Result<Option<WorkspaceRecord>, IndexError>;

    /// Full-replace upsert: any existing record for the id is overwritten
    /// wholesale, including absent optional fields.
    async fn put(&self, record: &WorkspaceRecord) -> Result<(), IndexError>;

    /// Narrow update of the `InstanceState` field only. A missing record is
    /// not an error (it may have been reaped since the caller read it).
    async fn set_state(&self, instance_id: &str, state: DesktopState) -> Result<(), IndexError>;

    async fn delete(&self, instance_id: &str) -> Result<(), IndexError>;

    /// One page of the full index; loop until `next_key` is `None`.
    async fn scan(&self, start_key: Option<&str>) -> Result<ScanPage, IndexError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Client for the index KV service
///
/// Layout: `{base}/tables/{table}/records[/{id}]`, with token-paged scans
/// via the `startKey` query parameter.
pub struct HttpIndex {
    client: reqwest::Client,
    base_url: String,
    table: String,
}

#[derive(Debug, Deserialize)]
struct ScanReply {
    #[serde(rename = "Records")]
    records: Vec<WorkspaceRecord>,
    #[serde(rename = "NextKey", default)]
    next_key: Option<String>,
}

impl HttpIndex {
    pub fn new(base_url: String, table: String, timeout_secs: u64) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            table,
        })
    }

    fn record_url(&self, instance_id: &str) -> String {
        format!("{}/tables/{}/records/{}", self.base_url, self.table, instance_id)
    }
}

#[async_trait]
impl WorkspaceIndex for HttpIndex {
    async fn get(&self, instance_id: &str) -> Result<Option<WorkspaceRecord>, IndexError> {
        let response = self.client.get(self.record_url(instance_id)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(IndexError::Status(response.status()));
        }

        Ok(Some(response.json().await?))
    }

    async fn put(&self, record: &WorkspaceRecord) -> Result<(), IndexError> {
        let response = self
            .client
            .put(self.record_url(&record.instance_id))
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::Status(response.status()));
        }
        Ok(())
    }

    async fn set_state(&self, instance_id: &str, state: DesktopState) -> Result<(), IndexError> {
        let response = self
            .client
            .patch(self.record_url(instance_id))
            .json(&serde_json::json!({ "InstanceState": state }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(instance_id, "state update skipped: record no longer exists");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(IndexError::Status(response.status()));
        }
        Ok(())
    }

    async fn delete(&self, instance_id: &str) -> Result<(), IndexError> {
        let response = self.client.delete(self.record_url(instance_id)).send().await?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(IndexError::Status(response.status()));
        }
        Ok(())
    }

    async fn scan(&self, start_key: Option<&str>) -> Result<ScanPage, IndexError> {
        let url = format!("{}/tables/{}/records", self.base_url, self.table);
        let mut request = self.client.get(url);
        if let Some(key) = start_key {
            request = request.query(&[("startKey", key)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(IndexError::Status(response.status()));
        }

        let reply: ScanReply = response.json().await?;
        Ok(ScanPage {
            records: reply.records,
            next_key: reply.next_key,
        })
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// Scan page size for the in-memory index. Small on purpose, so callers'
/// pagination loops see multi-page scans even with a handful of records.
const MEM_SCAN_PAGE_SIZE: usize = 2;

/// In-memory index for tests and local development
#[derive(Default)]
pub struct MemIndex {
    records: Mutex<BTreeMap<String, WorkspaceRecord>>,
}

impl MemIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, WorkspaceRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.locked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }
}

#[async_trait]
impl WorkspaceIndex for MemIndex {
    async fn get(&self, instance_id: &str) -> Result<Option<WorkspaceRecord>, IndexError> {
        Ok(self.locked().get(instance_id).cloned())
    }

    async fn put(&self, record: &WorkspaceRecord) -> Result<(), IndexError> {
        self.locked().insert(record.instance_id.clone(), record.clone());
        Ok(())
    }

    async fn set_state(&self, instance_id: &str, state: DesktopState) -> Result<(), IndexError> {
        match self.locked().get_mut(instance_id) {
            Some(record) => record.instance_state = state,
            None => {
                tracing::warn!(instance_id, "state update skipped: record no longer exists");
            }
        }
        Ok(())
    }

    async fn delete(&self, instance_id: &str) -> Result<(), IndexError> {
        self.locked().remove(instance_id);
        Ok(())
    }

    async fn scan(&self, start_key: Option<&str>) -> Result<ScanPage, IndexError> {
        let records = self.locked();
        let range = match start_key {
            Some(key) => records.range::<str, _>((Bound::Excluded(key), Bound::Unbounded)),
            None => records.range::<str, _>((Bound::Unbounded, Bound::Unbounded)),
        };

        let page: Vec<WorkspaceRecord> =
            range.take(MEM_SCAN_PAGE_SIZE).map(|(_, r)| r.clone()).collect();

        let next_key = match page.last() {
            Some(last) if page.len() == MEM_SCAN_PAGE_SIZE => {
                let bounds = (Bound::Excluded(last.instance_id.as_str()), Bound::Unbounded);
                records
                    .range::<str, _>(bounds)
                    .next()
                    .map(|_| last.instance_id.clone())
            }
            _ => None,
        };

        Ok(ScanPage {
            records: page,
            next_key,
        })
    }
}
