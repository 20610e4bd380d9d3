// ABOUTME: Slack Web API client over HTTPS with bot-token authentication
// ABOUTME: Implements the SlackApi contract: channel lookup, history, users, postMessage
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{MessagePage, RawMessage, SlackApi};
use crate::constants::slack::{API_BASE_URL, HISTORY_PAGE_LIMIT, REQUEST_TIMEOUT_SECS};
use crate::errors::{AppError, AppResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Envelope shared by all Slack Web API responses
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    payload: T,
}

#[derive(Debug, Deserialize)]
struct HistoryPayload {
    #[serde(default)]
    messages: Vec<RawMessage>,
    #[serde(default)]
    has_more: bool,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelListPayload {
    #[serde(default)]
    channels: Vec<ChannelInfo>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoPayload {
    user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    name: String,
    real_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmptyPayload {}

/// Slack Web API client.
///
/// All calls authenticate with the bot token and surface platform failures
/// (`ok: false` or transport errors) as external-service errors for the
/// fetch layer to handle.
#[derive(Clone)]
pub struct SlackHttpClient {
    client: Client,
    base_url: String,
    bot_token: String,
}

impl SlackHttpClient {
    /// Create a client for the production Slack API
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(bot_token: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(bot_token, API_BASE_URL)
    }

    /// Create a client against a custom API base URL (proxies, test stubs)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_base_url(
        bot_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            bot_token: bot_token.into(),
        })
    }

    /// GET a Slack API method and unwrap the `ok` envelope
    async fn get_api<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{method}", self.base_url);
        debug!(method, "Slack API request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::external_service("slack", format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(
                "slack",
                format!("{method} returned HTTP {status}"),
            ));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| AppError::external_service("slack", format!("{method}: {e}")))?;

        if !envelope.ok {
            return Err(AppError::external_service(
                "slack",
                format!(
                    "{method} failed: {}",
                    envelope.error.unwrap_or_else(|| "unknown error".to_owned())
                ),
            ));
        }

        Ok(envelope.payload)
    }
}

#[async_trait::async_trait]
impl SlackApi for SlackHttpClient {
    async fn resolve_channel_id(&self, channel_name: &str) -> AppResult<Option<String>> {
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![
                ("types", "public_channel,private_channel".to_owned()),
                ("limit", "1000".to_owned()),
                ("exclude_archived", "true".to_owned()),
            ];
            if let Some(cursor) = &cursor {
                query.push(("cursor", cursor.clone()));
            }

            let payload: ChannelListPayload = self.get_api("conversations.list", &query).await?;

            if let Some(channel) = payload.channels.iter().find(|ch| ch.name == channel_name) {
                return Ok(Some(channel.id.clone()));
            }

            cursor = payload
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|c| !c.is_empty());
            if cursor.is_none() {
                return Ok(None);
            }
        }
    }

    async fn list_message_page(
        &self,
        channel_id: &str,
        oldest: i64,
        latest: i64,
        cursor: Option<&str>,
    ) -> AppResult<MessagePage> {
        let mut query = vec![
            ("channel", channel_id.to_owned()),
            ("oldest", oldest.to_string()),
            ("latest", latest.to_string()),
            ("inclusive", "true".to_owned()),
            ("limit", HISTORY_PAGE_LIMIT.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_owned()));
        }

        let payload: HistoryPayload = self.get_api("conversations.history", &query).await?;

        Ok(MessagePage {
            messages: payload.messages,
            next_cursor: payload
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|c| !c.is_empty()),
            has_more: payload.has_more,
        })
    }

    async fn recent_message_page(&self, channel_id: &str, limit: u32) -> AppResult<MessagePage> {
        let query = vec![
            ("channel", channel_id.to_owned()),
            ("inclusive", "true".to_owned()),
            ("limit", limit.to_string()),
        ];

        let payload: HistoryPayload = self.get_api("conversations.history", &query).await?;

        Ok(MessagePage {
            messages: payload.messages,
            next_cursor: None,
            has_more: false,
        })
    }

    async fn resolve_display_name(&self, user_id: &str) -> AppResult<Option<String>> {
        let query = vec![("user", user_id.to_owned())];
        let payload: UserInfoPayload = self.get_api("users.info", &query).await?;

        Ok(payload
            .user
            .map(|user| user.real_name.unwrap_or(user.name)))
    }

    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        blocks: Option<serde_json::Value>,
    ) -> AppResult<()> {
        let mut body = serde_json::json!({
            "channel": channel_id,
            "text": text,
        });
        if let Some(blocks) = blocks {
            body["blocks"] = blocks;
        }

        let url = format!("{}/chat.postMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::external_service("slack", format!("chat.postMessage: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(
                "slack",
                format!("chat.postMessage returned HTTP {status}"),
            ));
        }

        let envelope: ApiEnvelope<EmptyPayload> = response
            .json()
            .await
            .map_err(|e| AppError::external_service("slack", format!("chat.postMessage: {e}")))?;

        if !envelope.ok {
            return Err(AppError::external_service(
                "slack",
                format!(
                    "chat.postMessage failed: {}",
                    envelope.error.unwrap_or_else(|| "unknown error".to_owned())
                ),
            ));
        }

        Ok(())
    }
}
