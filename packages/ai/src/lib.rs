#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM-backed one-sentence summaries for published alerts.
//!
//! Talks to any `OpenAI`-compatible chat completions endpoint (`OpenAI`
//! itself, or a local Ollama/vLLM server via `AI_BASE_URL`). Output is
//! best-effort by contract: temperature is above zero, so content is
//! non-deterministic and validated only for non-emptiness.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use traffic_watch_incident_models::Incident;

/// Default chat completions host.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model when `AI_MODEL` is not set.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Summaries are a single sentence; this bounds runaway output.
const MAX_TOKENS: u32 = 100;

const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str =
    "You are a traffic reporter creating engaging one-sentence summaries for traffic incidents.";

/// Errors that can occur during summary generation.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Trait for generating the human-readable summary of an incident.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produces a one-sentence summary for the incident.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider returns an
    /// empty summary.
    async fn summarize(&self, incident: &Incident) -> Result<String, AiError>;
}

/// `OpenAI`-compatible [`Summarizer`].
pub struct OpenAiSummarizer {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiSummarizer {
    /// Creates a summarizer with explicit credentials.
    #[must_use]
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Creates a summarizer from environment variables: `OPENAI_API_KEY`
    /// (required), `AI_MODEL`, and `AI_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, AiError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| AiError::Config {
            message: "OPENAI_API_KEY not set".to_string(),
        })?;
        let model = std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url = std::env::var("AI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, model, base_url))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, incident: &Incident) -> Result<String, AiError> {
        let prompt = build_prompt(incident);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        log::debug!("Requesting summary from {}", self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map_or(body, |api_error| api_error.error.message);
            return Err(AiError::Provider {
                message: format!("HTTP {status}: {message}"),
            });
        }

        let body: ChatResponse = response.json().await?;
        extract_summary(body)
    }
}

/// Builds the user prompt from the incident's fields.
fn build_prompt(incident: &Incident) -> String {
    let details = if incident.details.is_empty() {
        "No additional details available".to_string()
    } else {
        incident.details.join("; ")
    };
    format!(
        "Write a one-sentence summary with emojis for a traffic incident using the following details:\n\
         - Type: {}\n\
         - Report No.: {}\n\
         - Time: {}\n\
         - Location: {}\n\
         - Details: {details}\n\
         Make it concise, engaging, and include related emojis.",
        incident.report_type.as_deref().unwrap_or("N/A"),
        incident.number.as_deref().unwrap_or("N/A"),
        incident.time.as_deref().unwrap_or("N/A"),
        incident.location.as_deref().unwrap_or("N/A"),
    )
}

/// Pulls the summary text out of a chat response, rejecting empty output.
fn extract_summary(response: ChatResponse) -> Result<String, AiError> {
    let summary = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default()
        .trim()
        .to_string();

    if summary.is_empty() {
        return Err(AiError::Provider {
            message: "provider returned an empty summary".to_string(),
        });
    }
    Ok(summary)
}
