//! Answer generation provider
//!
//! Wraps the Gemini `generateContent` REST API behind the [`Generator`]
//! trait. Every failure mode maps to a distinct [`AppError`] variant with
//! its own log line, but callers present an identical, user-safe apology
//! for all of them (see [`apology_for`]).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};

/// Apology shown when no API key is configured.
pub const APOLOGY_NO_API_KEY: &str =
    "I apologize, but I cannot generate responses without a valid API key.";

/// Apology shown when the provider returned no candidates.
pub const APOLOGY_NO_ANSWER: &str =
    "I apologize, but I couldn't generate a response. Please try rephrasing your question.";

/// Apology shown when the response structure was incomplete.
pub const APOLOGY_INCOMPLETE: &str =
    "I apologize, but the response was incomplete. Please try again.";

/// Apology shown when the provider returned empty text.
pub const APOLOGY_EMPTY: &str =
    "I apologize, but I couldn't generate a meaningful response. Please try a different question.";

/// Apology shown on transport failures and timeouts.
pub const APOLOGY_UNAVAILABLE: &str =
    "I apologize, but I'm having trouble generating a response right now. Please try again later.";

/// Map a provider failure to the user-safe apology string shown in place of
/// an answer. Distinct failures log differently but degrade identically.
pub fn apology_for(err: &AppError) -> &'static str {
    match err {
        AppError::GenerationKeyMissing => APOLOGY_NO_API_KEY,
        AppError::GenerationNoCandidates => APOLOGY_NO_ANSWER,
        AppError::GenerationMalformed => APOLOGY_INCOMPLETE,
        AppError::GenerationEmptyText => APOLOGY_EMPTY,
        _ => APOLOGY_UNAVAILABLE,
    }
}

/// Fixed instruction template grounding the answer in retrieved articles.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful news assistant. Based on the following news articles, \
         answer the user's question accurately and concisely.\n\n\
         Context from recent news articles:\n{context}\n\n\
         User question: {question}\n\n\
         Please provide a helpful answer based on the news context above. \
         If the context doesn't contain relevant information, say so."
    )
}

/// Trait for grounded answer generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate an answer to `question` conditioned on `context`.
    async fn generate(&self, question: &str, context: &str) -> Result<String>;
}

/// Client for the Gemini `generateContent` API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(AppError::GenerationKeyMissing);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.api_url, self.config.model, self.config.api_key
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: build_prompt(question, context),
                }],
            }],
        };

        tracing::debug!(model = %self.config.model, "sending generation request");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::GenerationTimeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    AppError::GenerationError(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationError(format!(
                "API error {status}: {body}"
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::GenerationError(format!("failed to parse response: {e}")))?;

        let candidate = result
            .candidates
            .into_iter()
            .next()
            .ok_or(AppError::GenerationNoCandidates)?;

        let part = candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .ok_or(AppError::GenerationMalformed)?;

        match part.text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AppError::GenerationEmptyText),
        }
    }
}

/// Generator that echoes the question back, for pipeline tests.
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, question: &str, _context: &str) -> Result<String> {
        Ok(question.to_string())
    }
}
