//! Append-only, rotating audit trail of domain events.
//!
//! Events are JSONL envelopes in the ledger's data directory. The active
//! log rotates once its size crosses `max_bytes`: the active file becomes
//! generation `.1`, prior generations shift up, and anything beyond
//! `retention` is deleted. Appends and rotation share one mutex, so an
//! event lands in exactly one of the pre- or post-rotation files.

use crate::core::error::LedgerError;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const EVENT_LOG_NAME: &str = "ledger.events.jsonl";
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_RETENTION: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    ContextUpserted,
    RoleUpserted,
    RoleAssigned,
    StateAsserted,
    WorkStarted,
    WorkEnded,
    EvidenceBound,
    ServiceDefined,
    ServiceEvaluated,
    CapabilityDeclared,
    ParityRun,
    TrustScored,
    PolicySet,
    BridgeDefined,
    DrrRecorded,
}

/// Provenance carried by every event: which context the fact belongs to,
/// and optionally where on a path/slice it was produced and by whom.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventEnvelope {
    pub ctx: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_slice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
}

impl EventEnvelope {
    pub fn for_ctx(ctx: impl Into<String>) -> Self {
        Self {
            ctx: ctx.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub ts: String,
    pub event_id: String,
    pub envelope: EventEnvelope,
    pub payload: serde_json::Value,
}

impl EventRecord {
    pub fn new(event_type: EventType, envelope: EventEnvelope, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            ts: time::now_iso(),
            event_id: time::new_event_id(),
            envelope,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RotatedLog {
    pub generation: usize,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogStats {
    pub current_size: u64,
    pub rotated_logs: Vec<RotatedLog>,
    pub total_size: u64,
}

pub struct EventLog {
    path: PathBuf,
    max_bytes: u64,
    retention: usize,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn open(data_dir: &Path, max_bytes: u64, retention: usize) -> Result<Self, LedgerError> {
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(EVENT_LOG_NAME),
            max_bytes,
            retention,
            lock: Mutex::new(()),
        })
    }

    fn generation_path(&self, generation: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", generation));
        PathBuf::from(name)
    }

    pub fn append(&self, record: &EventRecord) -> Result<(), LedgerError> {
        let _guard = self.lock.lock().unwrap();
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        let size = file.metadata()?.len();
        drop(file);
        if size > self.max_bytes {
            self.rotate()?;
        }
        Ok(())
    }

    /// Shift generations up by one and retire the active log to `.1`.
    /// Callers hold the append lock.
    fn rotate(&self) -> Result<(), LedgerError> {
        let oldest = self.generation_path(self.retention);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for generation in (1..self.retention).rev() {
            let from = self.generation_path(generation);
            if from.exists() {
                fs::rename(&from, self.generation_path(generation + 1))?;
            }
        }
        fs::rename(&self.path, self.generation_path(1))?;
        Ok(())
    }

    pub fn stats(&self) -> Result<LogStats, LedgerError> {
        let _guard = self.lock.lock().unwrap();
        let current_size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        let mut rotated_logs = Vec::new();
        for generation in 1..=self.retention {
            let path = self.generation_path(generation);
            if let Ok(meta) = fs::metadata(&path) {
                rotated_logs.push(RotatedLog {
                    generation,
                    path,
                    size: meta.len(),
                });
            }
        }
        let total_size = current_size + rotated_logs.iter().map(|r| r.size).sum::<u64>();
        Ok(LogStats {
            current_size,
            rotated_logs,
            total_size,
        })
    }
}
