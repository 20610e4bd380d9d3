// ABOUTME: Slack platform integration: wire contract, HTTP client, and message fetching
// ABOUTME: Translates the platform's raw event shape into the pipeline's Message model
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Slack Platform Integration
//!
//! [`SlackApi`] is the chat-platform contract consumed by the pipeline;
//! [`client::SlackHttpClient`] is the production Web API implementation and
//! [`fetch::MessageFetcher`] layers pagination, filtering, enrichment, and
//! ordering on top of it.

/// Slack Web API HTTP client
pub mod client;
/// Range-based message fetching with pagination and author enrichment
pub mod fetch;

pub use client::SlackHttpClient;
pub use fetch::MessageFetcher;

use crate::errors::AppResult;
use serde::Deserialize;

/// One page of raw history returned by the platform
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    /// Raw events in platform order (newest first)
    pub messages: Vec<RawMessage>,
    /// Continuation cursor for the next page, when present
    pub next_cursor: Option<String>,
    /// Whether the platform reports further pages
    pub has_more: bool,
}

/// A raw message event as returned by the platform, before filtering
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    /// Platform timestamp
    pub ts: String,
    /// Author user id, absent for some system events
    pub user: Option<String>,
    /// Message text, absent for non-content events
    pub text: Option<String>,
    /// Parent thread timestamp for replies
    pub thread_ts: Option<String>,
    /// Set when the event was produced by a bot
    pub bot_id: Option<String>,
    /// Event type, `message` for content events
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Chat platform contract consumed by the digest pipeline.
///
/// Errors surface as a platform-error signal; the fetch layer decides
/// whether to degrade (fail-empty batches, raw-id authors) or propagate
/// (outbound message delivery).
#[async_trait::async_trait]
pub trait SlackApi: Send + Sync {
    /// Resolve a channel name to its stable id. `None` when no such channel.
    async fn resolve_channel_id(&self, channel_name: &str) -> AppResult<Option<String>>;

    /// Fetch one page of channel history within `[oldest, latest]` epoch
    /// seconds (inclusive), continuing from `cursor` when given.
    async fn list_message_page(
        &self,
        channel_id: &str,
        oldest: i64,
        latest: i64,
        cursor: Option<&str>,
    ) -> AppResult<MessagePage>;

    /// Fetch the most recent page of channel history, newest first
    async fn recent_message_page(&self, channel_id: &str, limit: u32) -> AppResult<MessagePage>;

    /// Resolve a user id to a display name. `None` when unknown.
    async fn resolve_display_name(&self, user_id: &str) -> AppResult<Option<String>>;

    /// Post a message to a channel, optionally with Block Kit blocks
    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        blocks: Option<serde_json::Value>,
    ) -> AppResult<()>;
}
