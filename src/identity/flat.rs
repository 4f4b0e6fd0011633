use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::identity::{is_plausible_session_id, mint_session_id, SessionId};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatState {
    session_id: String,
}

/// Strategy A: one persisted key.
///
/// The id lives in `<data_dir>/guest_session.json`. If the directory is not
/// writable the store degrades to an in-memory id for the remainder of the
/// process, so a storage-quota problem never blocks play.
pub struct FlatFileStore {
    path: PathBuf,
    cached: Mutex<Option<SessionId>>,
}

impl FlatFileStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join("guest_session.json"),
            cached: Mutex::new(None),
        }
    }

    pub fn get_or_create(&self) -> Result<SessionId> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref id) = *cached {
            return Ok(id.clone());
        }

        if let Some(id) = self.read_persisted() {
            *cached = Some(id.clone());
            return Ok(id);
        }

        let id = mint_session_id();
        if let Err(e) = self.persist(&id) {
            warn!(error = %e, "guest session not persisted, falling back to in-memory id");
        }
        *cached = Some(id.clone());
        Ok(id)
    }

    /// The current id, if any, without minting one.
    pub fn current(&self) -> Option<SessionId> {
        let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        cached.clone().or_else(|| self.read_persisted())
    }

    pub fn has_session(&self) -> bool {
        let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        cached.is_some() || self.read_persisted().is_some()
    }

    /// Forget the identity. Removal failures are logged and swallowed like
    /// persist failures: the cache reset alone guarantees clear-then-create,
    /// and a degraded disk must not turn a settled reconciliation into an
    /// error.
    pub fn clear(&self) -> Result<()> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *cached = None;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "guest session file not removed, in-memory identity cleared");
            }
        }
        Ok(())
    }

    fn read_persisted(&self) -> Option<SessionId> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let state: FlatState = serde_json::from_str(&content).ok()?;
        is_plausible_session_id(&state.session_id).then_some(state.session_id)
    }

    fn persist(&self, id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&FlatState {
            session_id: id.to_string(),
        })
        .unwrap_or_default();
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_idempotent_until_cleared() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path().to_path_buf());

        let first = store.get_or_create().unwrap();
        let second = store.get_or_create().unwrap();
        assert_eq!(first, second);
        assert!(store.has_session());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let first = FlatFileStore::new(dir.path().to_path_buf())
            .get_or_create()
            .unwrap();
        // Fresh store over the same directory simulates a page reload.
        let second = FlatFileStore::new(dir.path().to_path_buf())
            .get_or_create()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_clear_then_create_yields_new_id() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path().to_path_buf());

        let first = store.get_or_create().unwrap();
        store.clear().unwrap();
        assert!(!store.has_session());
        let second = store.get_or_create().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_clear_without_session_is_noop() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path().to_path_buf());
        store.clear().unwrap();
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guest_session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FlatFileStore::new(dir.path().to_path_buf());
        let id = store.get_or_create().unwrap();
        assert!(crate::identity::is_plausible_session_id(&id));
    }

    #[test]
    fn test_clear_in_degraded_storage_is_not_an_error() {
        let store = FlatFileStore::new(PathBuf::from("/dev/null/nope"));
        let first = store.get_or_create().unwrap();
        // Nothing was ever persisted; clearing must still succeed and yield
        // a fresh id afterwards.
        store.clear().unwrap();
        let second = store.get_or_create().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_unwritable_dir_degrades_to_memory() {
        // Point at a path that cannot be created.
        let store = FlatFileStore::new(PathBuf::from("/dev/null/nope"));
        let first = store.get_or_create().unwrap();
        let second = store.get_or_create().unwrap();
        assert_eq!(first, second);
    }
}
