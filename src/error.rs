use serde::Serialize;

/// All errors the client core can surface to the UI layer.
///
/// The scorer's rejections are distinct variants on purpose: the UI decides
/// between a retry button (`RateLimited`, `Network`) and a "come back
/// tomorrow" message (`AlreadyScoredToday`), so collapsing them would lose
/// that decision.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local persistence is unavailable (no home directory, quota, permissions).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Could not establish a guest session (server-delegated create/check failed).
    #[error("Cannot establish guest session: {0}")]
    SessionUnavailable(String),

    /// The scorer rate-limited this client.
    #[error("Rate limited — try again later")]
    RateLimited,

    /// The scorer already holds a submission for this identity today.
    #[error("Already scored today — come back tomorrow")]
    AlreadyScoredToday,

    /// The scorer rejected the submission payload.
    #[error("Invalid submission: {0}")]
    Validation(String),

    /// Login or registration failed. Never a reconciliation outcome: the
    /// guest identity is left untouched when this is returned.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A 2xx response whose body did not match the expected shape.
    #[error("Unexpected server response: {0}")]
    Protocol(String),

    #[error("{0}")]
    Custom(String),
}

// Frontends transport errors as plain strings.
impl Serialize for ClientError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
