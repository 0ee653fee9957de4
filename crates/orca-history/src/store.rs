use crate::record::ExecutionRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orca_core::{OrcaError, OrcaResult};
use parking_lot::RwLock;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// ExecutionLogStore trait
// ---------------------------------------------------------------------------

/// Append-only history of agent invocations.
///
/// Written by the invocation path, read by the monitor. `query` returns the
/// records whose `recorded_at` falls inside `[start, end]`, oldest first.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    async fn append(&self, record: ExecutionRecord) -> OrcaResult<()>;
    async fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OrcaResult<Vec<ExecutionRecord>>;
}

fn in_window(record: &ExecutionRecord, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    record.recorded_at >= start && record.recorded_at <= end
}

// ---------------------------------------------------------------------------
// MemoryLogStore
// ---------------------------------------------------------------------------

/// In-process history. Lost on exit.
#[derive(Default)]
pub struct MemoryLogStore {
    records: RwLock<Vec<ExecutionRecord>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ExecutionLogStore for MemoryLogStore {
    async fn append(&self, record: ExecutionRecord) -> OrcaResult<()> {
        self.records.write().push(record);
        Ok(())
    }

    async fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OrcaResult<Vec<ExecutionRecord>> {
        let mut matched: Vec<ExecutionRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| in_window(r, start, end))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.recorded_at);
        Ok(matched)
    }
}

// ---------------------------------------------------------------------------
// FileLogStore
// ---------------------------------------------------------------------------

/// JSON-lines history in `<dir>/executions.jsonl`.
pub struct FileLogStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLogStore {
    pub async fn new(dir: PathBuf) -> OrcaResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            path: dir.join("executions.jsonl"),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl ExecutionLogStore for FileLogStore {
    async fn append(&self, record: ExecutionRecord) -> OrcaResult<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OrcaResult<Vec<ExecutionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&self.path).await?;
        let mut matched = Vec::new();
        for (lineno, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ExecutionRecord = serde_json::from_str(line).map_err(|e| {
                OrcaError::Store(format!(
                    "corrupt history line {} in {}: {e}",
                    lineno + 1,
                    self.path.display()
                ))
            })?;
            if in_window(&record, start, end) {
                matched.push(record);
            }
        }
        matched.sort_by_key(|r| r.recorded_at);
        Ok(matched)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
