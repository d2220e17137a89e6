//! Whole-collection persistence for the status log.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CiStatus, StatusLogError};

/// Loads and saves the entire collection at once. The store never asks for
/// partial reads or writes.
#[async_trait]
pub trait StatusLogPersistence: Send + Sync {
    async fn load(&self) -> Result<Vec<CiStatus>, StatusLogError>;
    async fn save(&self, statuses: &[CiStatus]) -> Result<(), StatusLogError>;
}

#[derive(Deserialize)]
struct StatusDocument {
    #[serde(default)]
    statuses: Vec<CiStatus>,
}

#[derive(Serialize)]
struct StatusDocumentRef<'a> {
    statuses: &'a [CiStatus],
}

/// JSON document on disk: `{"statuses": [...]}`.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StatusLogError {
        StatusLogError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl StatusLogPersistence for JsonFilePersistence {
    async fn load(&self) -> Result<Vec<CiStatus>, StatusLogError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let document: StatusDocument = serde_json::from_slice(&bytes)?;
        Ok(document.statuses)
    }

    async fn save(&self, statuses: &[CiStatus]) -> Result<(), StatusLogError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }
        let body = serde_json::to_vec_pretty(&StatusDocumentRef { statuses })?;

        // Rename over the old file so readers never see a half-written document.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(|err| self.io_error(err))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|err| self.io_error(err))
    }
}

/// Keeps the saved collection in memory. Saves can be made to fail to
/// exercise the store's rollback path.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    statuses: Mutex<Vec<CiStatus>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(statuses: Vec<CiStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses),
            ..Self::default()
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<CiStatus> {
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl StatusLogPersistence for MemoryPersistence {
    async fn load(&self) -> Result<Vec<CiStatus>, StatusLogError> {
        Ok(self.snapshot())
    }

    async fn save(&self, statuses: &[CiStatus]) -> Result<(), StatusLogError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StatusLogError::Unavailable("save rejected".to_owned()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self
            .statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = statuses.to_vec();
        Ok(())
    }
}
