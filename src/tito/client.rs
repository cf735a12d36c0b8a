use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tracing::{debug, warn};

use super::types::{find_matching_answer, AnswersResponse, MatchPolicy, TicketAnswer};
use crate::config::TitoConfig;
use crate::error::{BotError, LookupError, Result};

/// Finds the ticket a Discord user registered with
#[async_trait]
pub trait TicketLookup: Send + Sync {
    /// `Ok(None)` when no registrant gave this username; `Err` only when the
    /// answer list could not be obtained
    async fn find_ticket_for_username(
        &self,
        username: &str,
    ) -> std::result::Result<Option<TicketAnswer>, LookupError>;
}

/// Client for the Tito question-answers endpoint
pub struct TitoClient {
    http_client: reqwest::Client,
    answers_url: String,
    policy: MatchPolicy,
}

impl TitoClient {
    pub fn new(config: &TitoConfig) -> Result<Self> {
        Self::with_timeout(config, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(config: &TitoConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Token token={}", config.token))
            .map_err(|_| BotError::ConfigValidation {
                message: "'tito.token' contains characters not allowed in a header".to_string(),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            answers_url: answers_url(config),
            policy: config.match_policy,
        })
    }

    pub fn answers_url(&self) -> &str {
        &self.answers_url
    }

    /// Fetch every answer to the configured question
    pub async fn fetch_answers(&self) -> std::result::Result<Vec<TicketAnswer>, LookupError> {
        debug!("Fetching ticket answers from {}", self.answers_url);

        let response = self.http_client.get(&self.answers_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Ticketing API returned {}: {}", status, body);
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let parsed: AnswersResponse =
            serde_json::from_slice(&body).map_err(|e| LookupError::Parse { source: e })?;

        debug!("Received {} ticket answers", parsed.answers.len());
        Ok(parsed.answers)
    }
}

#[async_trait]
impl TicketLookup for TitoClient {
    async fn find_ticket_for_username(
        &self,
        username: &str,
    ) -> std::result::Result<Option<TicketAnswer>, LookupError> {
        let answers = self.fetch_answers().await?;
        Ok(find_matching_answer(&answers, username, self.policy).cloned())
    }
}

/// `{api_base}/v3/{account}/{event}/questions/{question}/answers`
pub fn answers_url(config: &TitoConfig) -> String {
    format!(
        "{}/v3/{}/{}/questions/{}/answers",
        config.api_base.trim_end_matches('/'),
        config.account_slug,
        config.event_slug,
        config.question_slug
    )
}
