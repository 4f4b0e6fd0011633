//! Reconciliation: moving a guest's score onto a real account.
//!
//! Invoked once per login or registration attempt. The guest session id is
//! attached to the auth request when one exists; the server answers with a
//! transfer outcome, and the retention rule below decides what happens to
//! the local identity. This is the only place where "did the user lose
//! their trial score" is decided.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::identity::{is_plausible_session_id, IdentityStore};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub total_xp: u64,
}

/// What happened to the guest score, as a closed variant so the retention
/// rule is enforced by exhaustive matching rather than convention.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ReconcileOutcome {
    /// The guest score now belongs to the account.
    Transferred { score: u32 },
    /// The account already submitted for the current challenge period.
    AlreadySubmitted,
    /// No guest session was attached, or it had nothing scorable.
    NoGuestScore,
    /// Transient server-side failure; the guest identity must survive so
    /// the user can retry.
    TransferFailed,
}

impl ReconcileOutcome {
    /// Whether the local guest identity should be kept after this outcome.
    /// Only `TransferFailed` keeps it: everything else means there is
    /// nothing left to transfer.
    pub fn retains_identity(&self) -> bool {
        match self {
            ReconcileOutcome::Transferred { .. } => false,
            ReconcileOutcome::AlreadySubmitted => false,
            ReconcileOutcome::NoGuestScore => false,
            ReconcileOutcome::TransferFailed => true,
        }
    }
}

/// A successful login or registration: the user record, the auth token, and
/// the verdict on the guest score.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub user: UserProfile,
    pub token: String,
    pub outcome: ReconcileOutcome,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAuthResponse {
    user: UserProfile,
    token: String,
    score_transfer: Option<ReconcileOutcome>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

/// Client for the remote auth service.
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(ClientError::Network)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Log in, attaching the guest session if one exists, and settle the
    /// guest identity per the outcome.
    pub async fn login(
        &self,
        credentials: &Credentials,
        store: &IdentityStore,
    ) -> Result<AuthSession> {
        let session_id = attachable_session_id(store).await;
        let url = format!("{}/auth/login", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                email: &credentials.email,
                password: &credentials.password,
                session_id: session_id.as_deref(),
            })
            .send()
            .await?;

        let session = interpret_auth_response(response, session_id.is_some()).await?;
        apply_outcome(store, &session.outcome).await?;
        Ok(session)
    }

    /// Register a new account; otherwise identical to [`login`].
    ///
    /// [`login`]: AuthClient::login
    pub async fn register(
        &self,
        registration: &Registration,
        store: &IdentityStore,
    ) -> Result<AuthSession> {
        let session_id = attachable_session_id(store).await;
        let url = format!("{}/auth/register", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&RegisterRequest {
                username: &registration.username,
                email: &registration.email,
                password: &registration.password,
                session_id: session_id.as_deref(),
            })
            .send()
            .await?;

        let session = interpret_auth_response(response, session_id.is_some()).await?;
        apply_outcome(store, &session.outcome).await?;
        Ok(session)
    }
}

/// The guest session id to attach, if any. A lookup failure here downgrades
/// to "none attached" — a broken local store must not block login.
async fn attachable_session_id(store: &IdentityStore) -> Option<String> {
    match store.current().await {
        Ok(Some(id)) if is_plausible_session_id(&id) => Some(id),
        Ok(Some(id)) => {
            warn!(session_id = %id, "guest session id failed plausibility check, not attaching");
            None
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "guest session lookup failed, logging in without it");
            None
        }
    }
}

async fn interpret_auth_response(
    response: reqwest::Response,
    attached_session: bool,
) -> Result<AuthSession> {
    let status = response.status();
    if !status.is_success() {
        // Authentication failure, not a reconciliation outcome. The guest
        // identity is left untouched by the callers.
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("message")
                    .or_else(|| body.get("error"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("server returned {status}"));
        return Err(ClientError::Auth(message));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| ClientError::Protocol(e.to_string()))?;
    parse_auth_body(body, attached_session)
}

/// Interpret a 2xx auth body. Split from the transport so the outcome
/// branching is unit-testable.
fn parse_auth_body(body: serde_json::Value, attached_session: bool) -> Result<AuthSession> {
    let wire: WireAuthResponse =
        serde_json::from_value(body).map_err(|e| ClientError::Protocol(e.to_string()))?;

    let outcome = match wire.score_transfer {
        Some(outcome) => outcome,
        // No transfer report without an attached session is the ordinary
        // "nothing to reconcile" case. With one attached it means the
        // server dropped the ball, which callers must see verbatim.
        None if !attached_session => ReconcileOutcome::NoGuestScore,
        None => {
            return Err(ClientError::Protocol(
                "guest session attached but no transfer outcome reported".into(),
            ))
        }
    };

    Ok(AuthSession {
        user: wire.user,
        token: wire.token,
        outcome,
    })
}

/// Settle the guest identity after a reconciliation outcome. `TransferFailed`
/// retains it unchanged so the user can retry (manual retries, unlimited);
/// every other outcome clears it.
pub async fn apply_outcome(store: &IdentityStore, outcome: &ReconcileOutcome) -> Result<()> {
    if outcome.retains_identity() {
        warn!("guest score transfer failed, retaining guest session for retry");
        return Ok(());
    }
    debug!(?outcome, "clearing guest session after reconciliation");
    store.clear().await
}
