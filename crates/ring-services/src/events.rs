//! Event log — append-only audit trail of token and data activity.
//!
//! Nothing reads the log back to make decisions. A failed write is logged
//! and otherwise ignored so the ring keeps moving.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use ring_core::NodeId;
use serde::{Deserialize, Serialize};

/// What happened. Payload bytes are hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    TokenSent { seq: u32, to: NodeId },
    TokenReceived { seq: u32, from: NodeId },
    DataSent { seq: u16, to: NodeId, data: String },
    DataReceived {
        seq: u16,
        from: NodeId,
        to: NodeId,
        data: String,
    },
}

impl EventKind {
    pub fn data_sent(seq: u16, to: NodeId, payload: &[u8]) -> Self {
        EventKind::DataSent {
            seq,
            to,
            data: hex::encode(payload),
        }
    }

    pub fn data_received(seq: u16, from: NodeId, to: NodeId, payload: &[u8]) -> Self {
        EventKind::DataReceived {
            seq,
            from,
            to,
            data: hex::encode(payload),
        }
    }

    /// Decoded payload of a data event.
    pub fn payload(&self) -> Option<Vec<u8>> {
        match self {
            EventKind::DataSent { data, .. } | EventKind::DataReceived { data, .. } => {
                hex::decode(data).ok()
            }
            _ => None,
        }
    }
}

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub node: NodeId,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl EventRecord {
    pub fn now(node: NodeId, kind: EventKind) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            timestamp_ms,
            node,
            kind,
        }
    }
}

/// Destination for event records.
pub trait EventSink: Send + Sync {
    fn record(&self, record: EventRecord);
}

pub type SharedSink = Arc<dyn EventSink>;

// ── JSON lines file ───────────────────────────────────────────────────────────

/// Appends one JSON object per line to a file.
pub struct JsonlEventLog {
    path: PathBuf,
    file: File,
}

impl JsonlEventLog {
    /// Open (or create) the log for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventLogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| EventLogError::OpenFailed(path.clone(), e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EventLogError::OpenFailed(path.clone(), e))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &EventRecord) -> Result<(), EventLogError> {
        let mut line = serde_json::to_vec(record).map_err(EventLogError::Serialize)?;
        line.push(b'\n');
        // One write per line; O_APPEND keeps concurrent lines whole.
        (&self.file)
            .write_all(&line)
            .map_err(|e| EventLogError::WriteFailed(self.path.clone(), e))
    }
}

impl EventSink for JsonlEventLog {
    fn record(&self, record: EventRecord) {
        if let Err(e) = self.append(&record) {
            tracing::warn!(error = %e, "event log write failed");
        }
    }
}

/// Read every record back from a JSON lines log. Unparsable lines are skipped.
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<EventRecord>, EventLogError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| EventLogError::ReadFailed(path.to_path_buf(), e))?;
    Ok(text
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

// ── In memory ─────────────────────────────────────────────────────────────────

/// Keeps records in memory. Clones share the same record list.
#[derive(Clone, Default)]
pub struct MemoryEventLog {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Records whose kind matches `pred`, in arrival order.
    pub fn filter(&self, pred: impl Fn(&EventKind) -> bool) -> Vec<EventKind> {
        self.records()
            .into_iter()
            .map(|r| r.kind)
            .filter(|k| pred(k))
            .collect()
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, record: EventRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("failed to open {0}: {1}")]
    OpenFailed(PathBuf, std::io::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to serialize event: {0}")]
    Serialize(serde_json::Error),
}
