use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::builder::CompiledRequest;
use crate::error::AppError;
use crate::state::request_state::HttpMethod;
use crate::state::response_state::ResponseData;

/// One completed exchange, as recorded after a successful send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub response_status: u16,
    pub response_headers: BTreeMap<String, String>,
    pub response_body: String,
    pub response_time: u64,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_exchange(request: &CompiledRequest, response: &ResponseData) -> Self {
        Self {
            method: request.method,
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.as_ref().map(|b| b.to_text()),
            response_status: response.status(),
            response_headers: response.headers().clone(),
            response_body: response.body().to_string(),
            response_time: response.time_ms(),
            recorded_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn record(&self, entry: HistoryEntry) -> Result<(), AppError>;
}

/// Discards everything. Used when history is disabled.
pub struct NoopHistory;

#[async_trait]
impl HistorySink for NoopHistory {
    async fn record(&self, _entry: HistoryEntry) -> Result<(), AppError> {
        Ok(())
    }
}

/// Appends one JSON document per line.
pub struct JsonlHistory {
    path: PathBuf,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read back every entry; a missing file is an empty history.
    pub async fn load(&self) -> Result<Vec<HistoryEntry>, AppError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(AppError::from))
            .collect()
    }
}

#[async_trait]
impl HistorySink for JsonlHistory {
    async fn record(&self, entry: HistoryEntry) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Fire-and-forget: failures are logged and never reach the caller.
pub fn record_in_background(sink: Arc<dyn HistorySink>, entry: HistoryEntry) -> JoinHandle<()> {
    tokio::spawn(async move {
        let url = entry.url.clone();
        match sink.record(entry).await {
            Ok(()) => debug!(%url, "history recorded"),
            Err(e) => warn!(%url, error = %e, "failed to record history"),
        }
    })
}
