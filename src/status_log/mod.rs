//! Bounded, append-only log of CI pipeline runs.
//!
//! The store holds at most [`STATUS_LOG_CAPACITY`] entries in insertion order.
//! Appends past the cap drop the oldest entries. There is no update or delete.
//!
//! # Concurrency
//!
//! The whole collection sits behind one async mutex. An append holds it across
//! push, trim and save, so two appends can never both trim the same snapshot.

pub mod persistence;

use std::{num::NonZeroUsize, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub use persistence::{JsonFilePersistence, MemoryPersistence, StatusLogPersistence};

pub const STATUS_LOG_CAPACITY: usize = 500;
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum StatusLogError {
    #[error("invalid status: {0} must not be empty")]
    EmptyField(&'static str),
    #[error("status log i/o failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("status log document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("status log persistence unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Failed,
    Running,
}

/// One observed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiStatus {
    pub pipeline: String,
    pub status: PipelineStatus,
    pub commit: String,
    pub run_id: String,
    pub triggered_by: String,
    pub timestamp: DateTime<Utc>,
}

/// Webhook payload. `timestamp` falls back to ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiStatusInput {
    pub pipeline: String,
    pub status: PipelineStatus,
    pub commit: String,
    pub run_id: String,
    pub triggered_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CiStatusInput {
    pub fn validate(&self) -> Result<(), StatusLogError> {
        for (field, value) in [
            ("pipeline", &self.pipeline),
            ("commit", &self.commit),
            ("runId", &self.run_id),
            ("triggeredBy", &self.triggered_by),
        ] {
            if value.is_empty() {
                return Err(StatusLogError::EmptyField(field));
            }
        }
        Ok(())
    }

    fn into_status(self, now: DateTime<Utc>) -> CiStatus {
        CiStatus {
            pipeline: self.pipeline,
            status: self.status,
            commit: self.commit,
            run_id: self.run_id,
            triggered_by: self.triggered_by,
            timestamp: self.timestamp.unwrap_or(now),
        }
    }
}

/// How many entries `get_recent` returns. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentLimit(NonZeroUsize);

impl RecentLimit {
    pub fn new(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for RecentLimit {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(DEFAULT_RECENT_LIMIT - 1))
    }
}

pub struct StatusLog {
    persistence: Arc<dyn StatusLogPersistence>,
    statuses: Mutex<Vec<CiStatus>>,
}

impl StatusLog {
    /// Loads the persisted collection, trimming it to capacity.
    pub async fn open(persistence: Arc<dyn StatusLogPersistence>) -> Result<Self, StatusLogError> {
        let mut statuses = persistence.load().await?;
        trim_to_capacity(&mut statuses);
        debug!(entries = statuses.len(), "opened status log");
        Ok(Self {
            persistence,
            statuses: Mutex::new(statuses),
        })
    }

    /// Appends a run and persists the collection.
    ///
    /// # Errors
    ///
    /// Validation and persistence failures. On a failed save the in-memory
    /// log is left as it was before the call.
    pub async fn append(&self, input: CiStatusInput) -> Result<CiStatus, StatusLogError> {
        input.validate()?;
        let status = input.into_status(Utc::now());

        let mut statuses = self.statuses.lock().await;
        let mut next = Vec::with_capacity(statuses.len() + 1);
        next.extend_from_slice(&statuses);
        next.push(status.clone());
        let dropped = trim_to_capacity(&mut next);

        self.persistence.save(&next).await?;
        *statuses = next;

        info!(
            run_id = %status.run_id,
            pipeline = %status.pipeline,
            status = ?status.status,
            dropped,
            "recorded ci status"
        );
        Ok(status)
    }

    /// Most recent entries, newest first.
    pub async fn get_recent(&self, limit: RecentLimit) -> Vec<CiStatus> {
        let statuses = self.statuses.lock().await;
        statuses.iter().rev().take(limit.get()).cloned().collect()
    }

    /// First entry in storage order carrying `run_id`.
    pub async fn get_by_run_id(&self, run_id: &str) -> Option<CiStatus> {
        let statuses = self.statuses.lock().await;
        statuses.iter().find(|status| status.run_id == run_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.statuses.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.statuses.lock().await.is_empty()
    }
}

fn trim_to_capacity(statuses: &mut Vec<CiStatus>) -> usize {
    let excess = statuses.len().saturating_sub(STATUS_LOG_CAPACITY);
    if excess > 0 {
        statuses.drain(..excess);
    }
    excess
}
