// ABOUTME: Range-based message fetching with cursor pagination and a hard message cap
// ABOUTME: Filters non-content events, enriches author names, sanitizes markup, sorts by timestamp
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Message Fetching
//!
//! [`MessageFetcher`] turns the platform's paginated raw history into an
//! ordered, deduplicated [`Message`] batch. Pages are requested strictly
//! sequentially (the next page only after the current cursor is known), so
//! platform-side rate limits are naturally respected.
//!
//! A platform error mid-pagination degrades the whole call to an empty
//! batch: a partial batch would poison the cache layer's completeness
//! assumption, so partial success is never returned.

use super::{RawMessage, SlackApi};
use crate::errors::AppResult;
use crate::models::Message;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Fetches and normalizes channel messages through a [`SlackApi`]
#[derive(Clone)]
pub struct MessageFetcher {
    api: Arc<dyn SlackApi>,
    max_messages: usize,
}

impl MessageFetcher {
    /// Create a fetcher with the given per-digest message cap
    #[must_use]
    pub fn new(api: Arc<dyn SlackApi>, max_messages: usize) -> Self {
        Self { api, max_messages }
    }

    /// Fetch all content messages in `[oldest, latest]` epoch seconds.
    ///
    /// Returns at most the configured cap, ascending by timestamp with
    /// duplicate timestamps removed. Any platform error yields an empty
    /// batch (fail-empty, never partial).
    pub async fn fetch_range(&self, channel_id: &str, oldest: i64, latest: i64) -> Vec<Message> {
        match self.fetch_range_inner(channel_id, oldest, latest).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(channel_id, error = %e, "Fetching messages in range failed, returning empty batch");
                Vec::new()
            }
        }
    }

    async fn fetch_range_inner(
        &self,
        channel_id: &str,
        oldest: i64,
        latest: i64,
    ) -> AppResult<Vec<Message>> {
        let mut collected: Vec<Message> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .api
                .list_message_page(channel_id, oldest, latest, cursor.as_deref())
                .await?;

            collected.extend(page.messages.into_iter().filter_map(content_message));

            // Hard ceiling: stop paging the moment the cap is reached
            if collected.len() >= self.max_messages || !page.has_more {
                break;
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        collected.truncate(self.max_messages);
        debug!(channel_id, count = collected.len(), "Collected messages in range");

        let mut enriched = self.enrich_display_names(collected).await;
        sort_chronologically(&mut enriched);
        Ok(enriched)
    }

    /// Fetch the most recent content messages in chronological order.
    /// Used by the quick-recap flow; fail-empty like [`Self::fetch_range`].
    pub async fn recent_messages(&self, channel_id: &str, limit: u32) -> Vec<Message> {
        let page = match self.api.recent_message_page(channel_id, limit).await {
            Ok(page) => page,
            Err(e) => {
                warn!(channel_id, error = %e, "Fetching recent messages failed, returning empty batch");
                return Vec::new();
            }
        };

        let messages: Vec<Message> = page
            .messages
            .into_iter()
            .filter_map(content_message)
            .collect();

        let mut enriched = self.enrich_display_names(messages).await;
        sort_chronologically(&mut enriched);
        enriched
    }

    /// Replace author ids with display names, best effort.
    ///
    /// Each distinct id is looked up once; a failed or empty lookup leaves
    /// the raw id in place and never fails the batch.
    async fn enrich_display_names(&self, messages: Vec<Message>) -> Vec<Message> {
        let mut distinct_ids: Vec<String> = Vec::new();
        for msg in &messages {
            if !distinct_ids.contains(&msg.user) {
                distinct_ids.push(msg.user.clone());
            }
        }

        let lookups = distinct_ids
            .iter()
            .map(|id| self.api.resolve_display_name(id));
        let resolved = futures_util::future::join_all(lookups).await;

        let mut names: HashMap<String, String> = HashMap::new();
        for (id, result) in distinct_ids.into_iter().zip(resolved) {
            match result {
                Ok(Some(name)) => {
                    names.insert(id, name);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(user_id = %id, error = %e, "Display name lookup failed, keeping raw id");
                }
            }
        }

        messages
            .into_iter()
            .map(|mut msg| {
                if let Some(name) = names.get(&msg.user) {
                    msg.user = name.clone();
                }
                msg
            })
            .collect()
    }
}

/// Sort ascending by timestamp and drop duplicate timestamps.
/// Defends against out-of-order pagination and overlapping inclusive pages.
fn sort_chronologically(messages: &mut Vec<Message>) {
    messages.sort_by(|a, b| {
        a.ts_seconds()
            .partial_cmp(&b.ts_seconds())
            .unwrap_or(Ordering::Equal)
    });
    messages.dedup_by(|a, b| a.ts == b.ts);
}

/// Convert a raw event into a content [`Message`], filtering out bot
/// messages, non-message events, and events without text or author.
fn content_message(raw: RawMessage) -> Option<Message> {
    if raw.bot_id.is_some() || raw.kind.as_deref() != Some("message") {
        return None;
    }

    let user = raw.user?;
    let text = raw.text.filter(|t| !t.is_empty())?;

    Some(Message {
        ts: raw.ts,
        user,
        text: sanitize_message(&text),
        thread_ts: raw.thread_ts,
    })
}

fn user_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<@U\w+>").unwrap_or_else(|_| unreachable!()))
}

fn channel_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<#C\w+\|(\w+)>").unwrap_or_else(|_| unreachable!()))
}

fn labeled_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<https?://[^>|]+\|([^>]+)>").unwrap_or_else(|_| unreachable!()))
}

fn raw_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<https?://[^>]+>").unwrap_or_else(|_| unreachable!()))
}

/// Strip platform markup from message text: user and channel mentions,
/// links, and HTML entity escapes.
#[must_use]
pub fn sanitize_message(text: &str) -> String {
    let text = user_mention_re().replace_all(text, "@user");
    let text = channel_mention_re().replace_all(&text, "#$1");
    let text = labeled_link_re().replace_all(&text, "$1");
    let text = raw_link_re().replace_all(&text, "[link]");

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ts: &str, user: &str, text: &str) -> RawMessage {
        RawMessage {
            ts: ts.to_owned(),
            user: Some(user.to_owned()),
            text: Some(text.to_owned()),
            thread_ts: None,
            bot_id: None,
            kind: Some("message".to_owned()),
        }
    }

    #[test]
    fn test_content_message_filters_bots_and_system_events() {
        let mut bot = raw("1.0", "U1", "beep");
        bot.bot_id = Some("B1".to_owned());
        assert!(content_message(bot).is_none());

        let mut join = raw("2.0", "U1", "joined");
        join.kind = Some("channel_join".to_owned());
        assert!(content_message(join).is_none());

        let mut empty = raw("3.0", "U1", "");
        empty.text = Some(String::new());
        assert!(content_message(empty).is_none());

        let mut anonymous = raw("4.0", "U1", "hello");
        anonymous.user = None;
        assert!(content_message(anonymous).is_none());

        assert!(content_message(raw("5.0", "U1", "hello")).is_some());
    }

    #[test]
    fn test_sort_chronologically_orders_and_dedups() {
        let mut messages = vec![
            Message {
                ts: "100.3".to_owned(),
                user: "A".to_owned(),
                text: "third".to_owned(),
                thread_ts: None,
            },
            Message {
                ts: "100.1".to_owned(),
                user: "A".to_owned(),
                text: "first".to_owned(),
                thread_ts: None,
            },
            Message {
                ts: "100.1".to_owned(),
                user: "B".to_owned(),
                text: "duplicate".to_owned(),
                thread_ts: None,
            },
            Message {
                ts: "100.2".to_owned(),
                user: "B".to_owned(),
                text: "second".to_owned(),
                thread_ts: None,
            },
        ];

        sort_chronologically(&mut messages);

        let order: Vec<&str> = messages.iter().map(|m| m.ts.as_str()).collect();
        assert_eq!(order, vec!["100.1", "100.2", "100.3"]);
    }

    #[test]
    fn test_sanitize_message_strips_markup() {
        assert_eq!(sanitize_message("hi <@U123ABC>"), "hi @user");
        assert_eq!(sanitize_message("see <#C123ABC|general>"), "see #general");
        assert_eq!(
            sanitize_message("read <https://example.com/doc|the doc>"),
            "read the doc"
        );
        assert_eq!(sanitize_message("see <https://example.com>"), "see [link]");
        assert_eq!(sanitize_message("a &lt;b&gt; &amp; c"), "a <b> & c");
        assert_eq!(sanitize_message("  padded  "), "padded");
    }
}
