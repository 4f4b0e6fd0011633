use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::identity::SessionId;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: String,
}

/// Strategy C: the server mints and owns the session.
///
/// Durability comes from the server's http-only cookie, carried by the
/// reqwest cookie store; the id held here is only a cache of what the server
/// last told us. Unlike the file-backed drivers, every operation can fail
/// with a network error.
pub struct ServerSessionStore {
    client: reqwest::Client,
    base_url: String,
    cached: Mutex<Option<SessionId>>,
}

impl ServerSessionStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(ClientError::Network)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cached: Mutex::new(None),
        })
    }

    /// Ask the server whether it still recognizes a session for this client.
    /// `None` means the server holds no session (fresh client, or expired).
    pub async fn check_server_session(&self) -> Result<Option<SessionId>> {
        let url = format!("{}/guest/session", self.base_url);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => {
                let body: SessionResponse = response
                    .json()
                    .await
                    .map_err(|e| ClientError::Protocol(e.to_string()))?;
                Ok(Some(body.session_id))
            }
            status => Err(ClientError::SessionUnavailable(format!(
                "session check returned {status}"
            ))),
        }
    }

    /// Have the server mint a fresh session.
    pub async fn create_server_session(&self) -> Result<SessionId> {
        let url = format!("{}/guest/session", self.base_url);
        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::SessionUnavailable(format!(
                "session create returned {}",
                response.status()
            )));
        }
        let body: SessionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        debug!(session_id = %body.session_id, "server minted guest session");
        Ok(body.session_id)
    }

    pub async fn get_or_create(&self) -> Result<SessionId> {
        let mut cached = self.cached.lock().await;
        if let Some(ref id) = *cached {
            return Ok(id.clone());
        }

        let id = match self.check_server_session().await? {
            Some(id) => id,
            None => self.create_server_session().await?,
        };
        *cached = Some(id.clone());
        Ok(id)
    }

    pub async fn has_session(&self) -> Result<bool> {
        if self.cached.lock().await.is_some() {
            return Ok(true);
        }
        Ok(self.check_server_session().await?.is_some())
    }

    /// Release the server-side session and forget the cache. The cache is
    /// dropped even when the DELETE fails — the server's TTL will collect
    /// the remote record eventually.
    pub async fn clear(&self) -> Result<()> {
        let mut cached = self.cached.lock().await;
        *cached = None;

        let url = format!("{}/guest/session", self.base_url);
        match self.client.delete(&url).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => Ok(()),
            Ok(response) => {
                warn!(status = %response.status(), "guest session delete rejected");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "guest session delete failed");
                Ok(())
            }
        }
    }

    /// Drop the cached id without touching the server. Used when the server
    /// is already known to have forgotten the session.
    pub async fn forget_local(&self) {
        *self.cached.lock().await = None;
    }

    pub async fn cached_session_id(&self) -> Option<SessionId> {
        self.cached.lock().await.clone()
    }

    /// Adopt an id the server reported, refreshing the cache.
    pub(crate) async fn adopt(&self, id: SessionId) {
        *self.cached.lock().await = Some(id);
    }
}
