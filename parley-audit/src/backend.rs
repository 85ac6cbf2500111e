//! Event history storage backends

use crate::EventHistoryRecord;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Event history storage backend trait
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a record
    async fn append(&self, record: &EventHistoryRecord) -> Result<(), HistoryError>;

    /// Most recent records, newest first (if supported)
    async fn recent(&self, _limit: usize) -> Result<Vec<EventHistoryRecord>, HistoryError> {
        Err(HistoryError::NotSupported)
    }
}

/// History backend errors
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation not supported")]
    NotSupported,

    #[error("Backend error: {0}")]
    Other(String),
}

/// File-based history store
///
/// Appends records to a file, one JSON object per line.
pub struct FileHistoryStore {
    path: PathBuf,
    // serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl FileHistoryStore {
    /// Create a new file store
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use parley_audit::*;
    ///
    /// let store = FileHistoryStore::new("event-history.jsonl");
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn append(&self, record: &EventHistoryRecord) -> Result<(), HistoryError> {
        let mut line = record.to_json()?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EventHistoryRecord>, HistoryError> {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lines = BufReader::new(file).lines();
        let mut records = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str::<EventHistoryRecord>(&line)?);
        }

        Ok(records.into_iter().rev().take(limit).collect())
    }
}

/// Memory store for tests and development
///
/// With a record cap the oldest records are evicted first.
#[derive(Clone, Default)]
pub struct MemoryHistoryStore {
    records: Arc<Mutex<VecDeque<EventHistoryRecord>>>,
    max_records: usize,
}

impl MemoryHistoryStore {
    /// Create a new memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_records` records (0 = unlimited)
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Get all records, oldest first
    pub async fn records(&self) -> Vec<EventHistoryRecord> {
        self.records.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: &EventHistoryRecord) -> Result<(), HistoryError> {
        let mut records = self.records.lock().await;
        if self.max_records > 0 && records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EventHistoryRecord>, HistoryError> {
        let records = self.records.lock().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

/// Fan-out store
///
/// Appends to every inner store; the first failure is reported.
#[derive(Default)]
pub struct MultiHistoryStore {
    stores: Vec<Arc<dyn HistoryStore>>,
}

impl MultiHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a store
    pub fn with_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.stores.push(store);
        self
    }
}

#[async_trait]
impl HistoryStore for MultiHistoryStore {
    async fn append(&self, record: &EventHistoryRecord) -> Result<(), HistoryError> {
        for store in &self.stores {
            store.append(record).await?;
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EventHistoryRecord>, HistoryError> {
        for store in &self.stores {
            match store.recent(limit).await {
                Err(HistoryError::NotSupported) => continue,
                other => return other,
            }
        }
        Err(HistoryError::NotSupported)
    }
}
