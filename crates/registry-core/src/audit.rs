//! Audit sinks: in-memory, JSONL file, and no-op.

use async_trait::async_trait;
use registry_types::{AuditEntry, AuditSink, AuditSinkError};
use std::path::{Path, PathBuf};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock};

/// Discards entries; the registry's own log stays authoritative.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn append(&self, _entry: &AuditEntry) -> Result<(), AuditSinkError> {
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AuditEntry>, AuditSinkError> {
        Ok(Vec::new())
    }
}

/// Process-lifetime sink.
pub struct InMemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditSinkError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AuditEntry>, AuditSinkError> {
        Ok(self.entries.read().await.clone())
    }
}

/// JSONL file-backed sink. Pair with `Registry::restore_audit` to keep
/// numbering continuous across restarts.
pub struct JsonlAuditSink {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            append_lock: Mutex::new(()),
        }
    }
}

/// False when the file ends in a torn, unterminated line.
async fn ends_with_newline(f: &mut tokio::fs::File) -> std::io::Result<bool> {
    if f.metadata().await?.len() == 0 {
        return Ok(true);
    }
    f.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    f.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditSinkError> {
        let _guard = self.append_lock.lock().await;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        if !ends_with_newline(&mut f).await? {
            line.insert(0, '\n');
        }
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AuditEntry>, AuditSinkError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out: Vec<AuditEntry> = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => out.push(entry),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping unreadable audit line"
                ),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use registry_types::AuditKind;

    fn entry(seq: u64) -> AuditEntry {
        AuditEntry {
            seq,
            at: DateTime::from_timestamp(1_700_000_000 + seq as i64, 0).unwrap(),
            kind: AuditKind::Register,
            caller_id: format!("c{seq}"),
            target_id: None,
        }
    }

    #[tokio::test]
    async fn jsonl_sink_persists_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        assert!(sink.list().await.unwrap().is_empty());

        sink.append(&entry(0)).await.unwrap();
        sink.append(&entry(1)).await.unwrap();

        let reopened = JsonlAuditSink::new(&path);
        let listed = reopened.list().await.unwrap();
        assert_eq!(listed, vec![entry(0), entry(1)]);
    }

    #[tokio::test]
    async fn jsonl_sink_fails_on_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlAuditSink::new(dir.path().join("missing").join("audit.jsonl"));
        let err = sink.append(&entry(0)).await.unwrap_err();
        assert!(matches!(err, AuditSinkError::Io(_)));
    }

    #[tokio::test]
    async fn torn_trailing_line_is_skipped_and_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let first = serde_json::to_string(&entry(0)).unwrap();
        tokio::fs::write(&path, format!("{first}\n{{\"seq\":1,\"at")).await.unwrap();

        let sink = JsonlAuditSink::new(&path);
        assert_eq!(sink.list().await.unwrap(), vec![entry(0)]);

        sink.append(&entry(1)).await.unwrap();
        assert_eq!(sink.list().await.unwrap(), vec![entry(0), entry(1)]);
    }

    #[tokio::test]
    async fn in_memory_sink_lists_appended() {
        let sink = InMemoryAuditSink::new();
        sink.append(&entry(0)).await.unwrap();
        assert_eq!(sink.list().await.unwrap(), vec![entry(0)]);
    }
}
