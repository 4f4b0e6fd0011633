//! Guest identity: one durable opaque session id per browsing context.
//!
//! Three interchangeable drivers back the same contract. A deployment
//! constructs exactly one of them (see [`ClientConfig::identity_driver`]);
//! they are alternatives, never composed:
//!
//! - [`flat::FlatFileStore`] — a single persisted key, minted client-side.
//! - [`records::RecordStore`] — structured records with local submission
//!   receipts for audit/debug.
//! - [`server::ServerSessionStore`] — the server mints and persists the
//!   session; the client only caches it.

mod flat;
mod records;
mod server;

pub use flat::FlatFileStore;
pub use records::{RecordStore, SessionRecord, SubmissionReceipt};
pub use server::ServerSessionStore;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{ClientConfig, IdentityDriver};
use crate::error::Result;

pub type SessionId = String;

/// Mint a fresh RFC-4122 v4 session id.
pub fn mint_session_id() -> SessionId {
    uuid::Uuid::new_v4().to_string()
}

/// Structural sanity check before a session id is attached to any request.
/// Keeps garbage (truncated ids, empty strings) off the wire; not a full
/// UUID parse on purpose — the server treats the id as opaque.
pub fn is_plausible_session_id(id: &str) -> bool {
    id.len() >= 32 && id.contains('-')
}

/// Current time as Unix timestamp (seconds). Advisory only: used for record
/// selection among multiples and for the server's TTL decisions.
pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// The one identity store the running client holds, dispatching to whichever
/// driver the deployment chose.
///
/// All three drivers share this surface: `get_or_create` is idempotent until
/// `clear`, and `clear` is a no-op when no session exists. The file-backed
/// drivers complete without suspending; the server driver performs network
/// I/O, which is why the whole surface is async.
pub enum IdentityStore {
    Flat(FlatFileStore),
    Records(RecordStore),
    Server(ServerSessionStore),
}

impl IdentityStore {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(match config.identity_driver {
            IdentityDriver::Flat => {
                IdentityStore::Flat(FlatFileStore::new(config.data_dir()?))
            }
            IdentityDriver::Records => {
                IdentityStore::Records(RecordStore::new(config.data_dir()?))
            }
            IdentityDriver::Server => {
                IdentityStore::Server(ServerSessionStore::new(&config.api_base_url)?)
            }
        })
    }

    /// Return the session id for this browsing context, creating one if
    /// needed. Repeated calls return the identical id until [`clear`].
    ///
    /// [`clear`]: IdentityStore::clear
    pub async fn get_or_create(&self) -> Result<SessionId> {
        match self {
            IdentityStore::Flat(store) => store.get_or_create(),
            IdentityStore::Records(store) => store.get_or_create(),
            IdentityStore::Server(store) => store.get_or_create().await,
        }
    }

    pub async fn has_session(&self) -> Result<bool> {
        match self {
            IdentityStore::Flat(store) => Ok(store.has_session()),
            IdentityStore::Records(store) => Ok(store.has_session()),
            IdentityStore::Server(store) => store.has_session().await,
        }
    }

    /// The current id without creating one. Used at reconciliation time:
    /// login must never mint a fresh identity just to attach it.
    pub async fn current(&self) -> Result<Option<SessionId>> {
        match self {
            IdentityStore::Flat(store) => Ok(store.current()),
            IdentityStore::Records(store) => Ok(store.current()),
            IdentityStore::Server(store) => match store.cached_session_id().await {
                Some(id) => Ok(Some(id)),
                None => store.check_server_session().await,
            },
        }
    }

    /// Forget the current identity. Safe to call when none exists.
    pub async fn clear(&self) -> Result<()> {
        match self {
            IdentityStore::Flat(store) => store.clear(),
            IdentityStore::Records(store) => store.clear(),
            IdentityStore::Server(store) => store.clear().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_ids_are_plausible_and_unique() {
        let a = mint_session_id();
        let b = mint_session_id();
        assert!(is_plausible_session_id(&a));
        assert!(is_plausible_session_id(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_plausibility_rejects_garbage() {
        assert!(!is_plausible_session_id(""));
        assert!(!is_plausible_session_id("abc-123"));
        assert!(!is_plausible_session_id(&"a".repeat(40))); // no hyphen
    }
}
