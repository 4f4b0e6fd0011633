use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::Result;
use crate::identity::{ServerSessionStore, SessionId};

/// Lifecycle of the server-delegated session as this client believes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Initializing,
    Ready,
    Syncing,
    /// The server no longer recognizes the session (expired or evicted);
    /// local state was dropped. The next `initialize` starts over.
    Cleared,
}

/// Keeps local belief about the server-delegated session in step with the
/// server. Owns a periodic background task that re-checks the session and
/// drops local state when the server has forgotten it, so callers are never
/// handed a dead identifier.
///
/// Explicitly constructed; whoever constructs it owns the timer lifecycle
/// and must call [`clear_session`] (or drop the whole client) on teardown.
///
/// [`clear_session`]: GuestSessionSync::clear_session
pub struct GuestSessionSync {
    store: Arc<ServerSessionStore>,
    // Held across the whole of initialize/sync/clear so they never overlap.
    state: Arc<Mutex<SyncState>>,
    active: Arc<AtomicBool>,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
}

impl GuestSessionSync {
    pub fn new(store: Arc<ServerSessionStore>, interval_secs: u64) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(SyncState::Uninitialized)),
            active: Arc::new(AtomicBool::new(false)),
            timer_handle: Mutex::new(None),
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Adopt the server's existing session or have it mint one, then start
    /// the periodic re-check. Returns the cached id when already `Ready`.
    /// Failure here propagates: no identity is usable without it.
    pub async fn initialize(&self) -> Result<SessionId> {
        let mut state = self.state.lock().await;

        if *state == SyncState::Ready {
            if let Some(id) = self.store.cached_session_id().await {
                return Ok(id);
            }
        }

        *state = SyncState::Initializing;

        let id = match self.store.check_server_session().await {
            Ok(Some(id)) => {
                self.store.adopt(id.clone()).await;
                id
            }
            Ok(None) => {
                let id = self.store.create_server_session().await?;
                self.store.adopt(id.clone()).await;
                id
            }
            Err(e) => {
                *state = SyncState::Uninitialized;
                return Err(e);
            }
        };

        *state = SyncState::Ready;
        drop(state);

        self.start_timer().await;
        Ok(id)
    }

    /// Re-query the server and reconcile local belief. Network failures are
    /// logged and swallowed; a server that has forgotten the session clears
    /// local state instead.
    pub async fn sync_with_server(&self) -> SyncState {
        sync_once(&self.store, &self.state, &self.active).await
    }

    /// Cancel the timer, then release the server-side session. Safe to call
    /// when nothing was ever initialized.
    pub async fn clear_session(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);

        // Cancel-then-await: a tick may already be past its flag check, so
        // wait for the task to actually finish before touching shared state.
        if let Some(handle) = self.timer_handle.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }

        let mut state = self.state.lock().await;
        self.store.clear().await?;
        *state = SyncState::Cleared;
        Ok(())
    }

    pub async fn state(&self) -> SyncState {
        *self.state.lock().await
    }

    /// Convenience for callers that treat the synchronizer as their
    /// identity store: hands out the cached id while `Ready`, otherwise
    /// (re-)initializes.
    pub async fn get_or_create(&self) -> Result<SessionId> {
        match self.store.cached_session_id().await {
            Some(id) if self.state().await == SyncState::Ready => Ok(id),
            _ => self.initialize().await,
        }
    }

    pub async fn has_session(&self) -> Result<bool> {
        Ok(self.state().await == SyncState::Ready
            && self.store.cached_session_id().await.is_some())
    }

    async fn start_timer(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return; // already running
        }

        let store = self.store.clone();
        let state = self.state.clone();
        let active = self.active.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                if !active.load(Ordering::SeqCst) {
                    break;
                }

                if sync_once(&store, &state, &active).await == SyncState::Cleared {
                    // Nothing left to watch until the next initialize.
                    active.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        *self.timer_handle.lock().await = Some(handle);
    }
}

async fn sync_once(
    store: &ServerSessionStore,
    state: &Mutex<SyncState>,
    active: &AtomicBool,
) -> SyncState {
    let mut state = state.lock().await;

    if *state != SyncState::Ready {
        return *state;
    }
    *state = SyncState::Syncing;

    let result = store.check_server_session().await;

    // A clear may have been requested while we were on the wire; its
    // teardown owns the state from here, not this tick's verdict.
    if !active.load(Ordering::SeqCst) {
        *state = SyncState::Ready;
        return *state;
    }

    match result {
        Ok(Some(id)) => {
            store.adopt(id).await;
            *state = SyncState::Ready;
        }
        Ok(None) => {
            info!("server no longer recognizes guest session, clearing local state");
            store.forget_local().await;
            *state = SyncState::Cleared;
        }
        Err(e) => {
            warn!(error = %e, "guest session sync failed, will retry next tick");
            *state = SyncState::Ready;
        }
    }
    *state
}
