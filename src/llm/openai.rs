// ABOUTME: OpenAI chat-completions client for digest summaries and quick recaps
// ABOUTME: Maps API failures to typed errors; rate limits surface as ExternalRateLimited
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::Summarizer;
use crate::constants::llm::{
    API_BASE_URL, RECAP_MAX_TOKENS, REQUEST_TIMEOUT_SECS, TEMPERATURE,
};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::Message;
use chrono::DateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Number of trailing messages considered for a quick recap
const RECAP_WINDOW: usize = 20;

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// Provider
// ============================================================================

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint
#[derive(Clone)]
pub struct OpenAiSummarizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiSummarizer {
    /// Create a summarizer for the production OpenAI API
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> AppResult<Self> {
        Self::with_base_url(api_key, model, max_tokens, API_BASE_URL)
    }

    /// Create a summarizer against a custom base URL (OpenAI-compatible
    /// endpoints such as proxies or self-hosted servers)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        base_url: impl Into<String>,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        })
    }

    /// Issue one chat completion and return the first choice's content
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: String,
        max_tokens: u32,
    ) -> AppResult<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ApiMessage {
                    role: "system".to_owned(),
                    content: system_prompt.to_owned(),
                },
                ApiMessage {
                    role: "user".to_owned(),
                    content: user_prompt,
                },
            ],
            max_tokens,
            temperature: TEMPERATURE,
        };

        debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external_service("openai", e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external_service("openai", e.to_string()))?;

        if !status.is_success() {
            return Err(Self::parse_error_response(status, &body));
        }

        let completion: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::new(
                ErrorCode::SerializationError,
                format!("Malformed completion response: {e}"),
            )
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::external_service("openai", "completion returned no content")
            })
    }

    /// Map an API error body to a typed error
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        let detail = serde_json::from_str::<ApiErrorResponse>(body)
            .map_or_else(|_| body.chars().take(200).collect(), |e| e.error.message);

        match status.as_u16() {
            401 => AppError::invalid_input(format!("API authentication failed: {detail}")),
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                format!("Summarization rate limit reached: {detail}"),
            ),
            _ => AppError::external_service("openai", format!("({status}): {detail}")),
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, messages: &[Message], channel_name: &str) -> AppResult<String> {
        let transcript = format_transcript(messages);
        let prompt = format!(
            "You are analyzing messages from the Slack channel #{channel_name}. \
             Provide a comprehensive summary with the following structure:\n\n\
             **DAILY SUMMARY**\n\
             - Key topics discussed\n\
             - Important decisions made\n\
             - Progress updates mentioned\n\n\
             **ACTION ITEMS**\n\
             - Specific tasks mentioned, with assignees and deadlines when given\n\n\
             **SENTIMENT**\n\
             - Overall team mood and any blockers raised\n\n\
             **KEY PARTICIPANTS**\n\
             - Most active contributors\n\n\
             Here are the messages to analyze:\n\n{transcript}\n\n\
             Format your response in clear sections using markdown."
        );

        self.complete(
            "You are a helpful assistant that specializes in analyzing team \
             communications and creating concise, actionable summaries.",
            prompt,
            self.max_tokens,
        )
        .await
    }

    async fn quick_recap(&self, messages: &[Message], channel_name: &str) -> AppResult<String> {
        let recent = if messages.len() > RECAP_WINDOW {
            &messages[messages.len() - RECAP_WINDOW..]
        } else {
            messages
        };
        let transcript = format_transcript(recent);
        let prompt = format!(
            "Provide a quick recap of the recent messages from #{channel_name}:\n\n\
             **QUICK SUMMARY**\n\
             - What was discussed (2-3 bullet points)\n\
             - Any immediate action items\n\n\
             **NEXT STEPS**\n\
             - What needs to happen next and who should follow up\n\n\
             Keep it concise and actionable.\n\n\
             Messages:\n{transcript}"
        );

        self.complete(
            "You are a helpful assistant that creates brief, actionable recaps \
             of team conversations.",
            prompt,
            RECAP_MAX_TOKENS,
        )
        .await
    }
}

/// Render a batch as `[HH:MM:SS] author: text` lines, UTC wall clock
fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| {
            let time = DateTime::from_timestamp(msg.ts_seconds() as i64, 0)
                .map_or_else(|| msg.ts.clone(), |dt| dt.format("%H:%M:%S").to_string());
            format!("[{time}] {}: {}", msg.user, msg.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
