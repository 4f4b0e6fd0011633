use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::identity::{mint_session_id, now_unix, SessionId};

/// Local receipt of a scored submission, kept for audit/debug. The server
/// remains the authority on what was actually scored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub prompt_id: String,
    pub score: u32,
    pub scored_at: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: u64,
    pub last_activity: u64,
    #[serde(default)]
    pub submissions: Vec<SubmissionReceipt>,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordsState {
    records: HashMap<String, SessionRecord>,
}

/// Strategy B: structured store keyed by session id.
///
/// Only one record should exist in practice, but two contexts racing before
/// either persists can leave more than one on disk; `get_or_create` then
/// settles on the record with the greatest `last_activity` instead of
/// erroring.
pub struct RecordStore {
    path: PathBuf,
    cached: Mutex<Option<SessionId>>,
}

impl RecordStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join("guest_sessions.json"),
            cached: Mutex::new(None),
        }
    }

    pub fn get_or_create(&self) -> Result<SessionId> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref id) = *cached {
            return Ok(id.clone());
        }

        let mut state = self.load();
        let now = now_unix();

        let chosen = state
            .records
            .values()
            .max_by_key(|r| (r.last_activity, r.session_id.clone()))
            .map(|r| r.session_id.clone());

        let id = match chosen {
            Some(id) => {
                if let Some(record) = state.records.get_mut(&id) {
                    record.last_activity = now;
                }
                id
            }
            None => {
                let id = mint_session_id();
                state.records.insert(
                    id.clone(),
                    SessionRecord {
                        session_id: id.clone(),
                        created_at: now,
                        last_activity: now,
                        submissions: Vec::new(),
                    },
                );
                id
            }
        };

        if let Err(e) = self.persist(&state) {
            warn!(error = %e, "guest session records not persisted, falling back to in-memory id");
        }
        *cached = Some(id.clone());
        Ok(id)
    }

    /// The current id, if any, without creating a record or bumping
    /// `last_activity`.
    pub fn current(&self) -> Option<SessionId> {
        let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        cached.clone().or_else(|| {
            self.load()
                .records
                .values()
                .max_by_key(|r| (r.last_activity, r.session_id.clone()))
                .map(|r| r.session_id.clone())
        })
    }

    pub fn has_session(&self) -> bool {
        let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        cached.is_some() || !self.load().records.is_empty()
    }

    /// Forget all records. Removal failures are logged and swallowed like
    /// persist failures: the cache reset alone guarantees clear-then-create,
    /// and a degraded disk must not turn a settled reconciliation into an
    /// error.
    pub fn clear(&self) -> Result<()> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *cached = None;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "guest session records not removed, in-memory identity cleared");
            }
        }
        Ok(())
    }

    /// Append a scored-submission receipt to the active record.
    pub fn append_submission(&self, receipt: SubmissionReceipt) -> Result<()> {
        let id = self.get_or_create()?;
        let mut state = self.load();
        if let Some(record) = state.records.get_mut(&id) {
            record.last_activity = now_unix();
            record.submissions.push(receipt);
        }
        self.persist(&state)
    }

    /// Receipts held for the active record, oldest first.
    pub fn submissions(&self) -> Vec<SubmissionReceipt> {
        let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        let Some(ref id) = *cached else {
            return Vec::new();
        };
        self.load()
            .records
            .get(id)
            .map(|r| r.submissions.clone())
            .unwrap_or_default()
    }

    fn load(&self) -> RecordsState {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return RecordsState::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    fn persist(&self, state: &RecordsState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state).unwrap_or_default();
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
