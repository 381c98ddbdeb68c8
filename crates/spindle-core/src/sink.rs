//! Failed-task sink: the append-only durable record of tasks that
//! exhausted their retries.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::TaskMeta;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("serialize failed-task record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("write failed-task record: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only sink receiving the final snapshot of each terminally failed
/// task. The only state that survives a process restart.
#[async_trait]
pub trait FailedTaskSink: Send + Sync {
    async fn append(&self, record: &TaskMeta) -> Result<(), SinkError>;
}

/// File-backed sink: one JSON object per line, appended.
#[derive(Debug, Clone)]
pub struct JsonLineSink {
    path: PathBuf,
}

impl JsonLineSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FailedTaskSink for JsonLineSink {
    async fn append(&self, record: &TaskMeta) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record)?;
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

/// In-memory sink for tests and demos.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TaskMeta>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<TaskMeta> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl FailedTaskSink for MemorySink {
    async fn append(&self, record: &TaskMeta) -> Result<(), SinkError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, TaskRecord, TaskSpec, TaskStatus};
    use chrono::Utc;

    fn failed_meta() -> TaskMeta {
        let mut meta = TaskRecord::from_spec(
            TaskId::generate(),
            TaskSpec::new(|| Ok(serde_json::json!(null))),
            Utc::now(),
        )
        .meta;
        meta.status = TaskStatus::Failed;
        meta.last_error = Some("network error: reset".into());
        meta
    }

    #[tokio::test]
    async fn json_line_sink_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed_tasks.jsonl");
        let sink = JsonLineSink::new(&path);

        let first = failed_meta();
        let second = failed_meta();
        sink.append(&first).await.unwrap();
        sink.append(&second).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: TaskMeta = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.id, first.id);
        assert_eq!(parsed.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn memory_sink_collects_records() {
        let sink = MemorySink::new();
        let meta = failed_meta();
        sink.append(&meta).await.unwrap();

        let records = sink.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, meta.id);
    }
}
