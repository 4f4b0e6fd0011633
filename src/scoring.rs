//! Client for the remote scorer.
//!
//! The scorer owns the "one scored attempt per identity per day" rule; this
//! client never re-checks it locally, it only keeps the scorer's verdicts
//! distinguishable so the UI can pick between a retry button and a "come
//! back tomorrow" message.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Today's challenge: an AI output whose prompt the player reconstructs.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub output: String,
    pub date: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u32,
    pub feedback: String,
    pub xp_awarded: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreGuestRequest<'a> {
    user_prompt: &'a str,
    prompt_id: &'a str,
    session_id: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RejectionBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct ScoringClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScoringClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(ClientError::Network)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn todays_challenge(&self) -> Result<Challenge> {
        let url = format!("{}/challenge/today", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Custom(format!(
                "challenge fetch returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Submit a guest attempt for scoring, tied to the guest session id.
    pub async fn score_guest(
        &self,
        user_prompt: &str,
        prompt_id: &str,
        session_id: &str,
    ) -> Result<ScoreResult> {
        let url = format!("{}/score/guest", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ScoreGuestRequest {
                user_prompt,
                prompt_id,
                session_id,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: RejectionBody = response.json().await.unwrap_or_default();
        Err(scorer_rejection(status, body))
    }
}

/// Map a scorer rejection to its distinct error variant.
fn scorer_rejection(status: reqwest::StatusCode, body: RejectionBody) -> ClientError {
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
        reqwest::StatusCode::BAD_REQUEST => {
            if body.code.as_deref() == Some("alreadyScored") {
                ClientError::AlreadyScoredToday
            } else {
                ClientError::Validation(
                    body.message.unwrap_or_else(|| "invalid submission".into()),
                )
            }
        }
        status => ClientError::Custom(format!(
            "scorer returned {status}: {}",
            body.message.unwrap_or_default()
        )),
    }
}
