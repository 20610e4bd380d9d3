// ABOUTME: Digest orchestrator: cache resolution, fetch, summarize, aggregate, store
// ABOUTME: Enforces one in-flight generation per process with an RAII-released atomic guard
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Digest Orchestrator
//!
//! State machine per (channel, date) request:
//! `CHECK_CACHE -> (hit: RETURN) | (miss: FETCH -> SUMMARIZE -> AGGREGATE -> STORE -> RETURN)`.
//!
//! Generation is single-flight for the whole process, not per channel: a
//! competing call while one generation runs gets an absent result
//! immediately and must retry later. This is a known limitation, kept
//! deliberately coarse. Scheduled batch runs hold the guard once for the
//! entire run so their channels can proceed concurrently while interactive
//! requests are still rejected.

use super::{cache::DigestCache, date_string, day_bounds, utc_today};
use crate::config::DigestConfig;
use crate::constants::slack::RECAP_MESSAGE_LIMIT;
use crate::errors::{AppError, AppResult};
use crate::llm::Summarizer;
use crate::models::{ChannelDigest, Message, Participant};
use crate::slack::{MessageFetcher, SlackApi};
use chrono::{Days, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// RAII guard releasing the in-flight flag on every exit path
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// The digest pipeline orchestrator.
///
/// Owns the decision of when to read or write the cache and when to call
/// the platform; collaborators are request/response only and hold no
/// back-references.
pub struct DigestService {
    slack: Arc<dyn SlackApi>,
    fetcher: MessageFetcher,
    summarizer: Arc<dyn Summarizer>,
    cache: DigestCache,
    config: DigestConfig,
    in_flight: AtomicBool,
}

impl DigestService {
    /// Assemble the pipeline from its collaborators
    #[must_use]
    pub fn new(
        slack: Arc<dyn SlackApi>,
        summarizer: Arc<dyn Summarizer>,
        cache: DigestCache,
        config: DigestConfig,
    ) -> Self {
        let fetcher = MessageFetcher::new(slack.clone(), config.max_messages_per_digest);
        Self {
            slack,
            fetcher,
            summarizer,
            cache,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Watched channels included in scheduled batch runs
    #[must_use]
    pub fn watched_channels(&self) -> &[String] {
        &self.config.watched_channels
    }

    /// Access the digest cache (health checks)
    #[must_use]
    pub const fn cache(&self) -> &DigestCache {
        &self.cache
    }

    /// Try to claim the process-wide generation slot
    fn try_acquire(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then_some(InFlightGuard {
                flag: &self.in_flight,
            })
    }

    /// Generate (or return the cached) digest for one channel and day.
    ///
    /// `date` defaults to the current UTC day. Returns `Ok(None)` when the
    /// channel is unknown, the day has no messages, or another generation
    /// is already in flight — all defined "try later" outcomes rather than
    /// errors. Summarization failures propagate.
    ///
    /// # Errors
    ///
    /// Returns an error if the summarization call fails.
    pub async fn generate_daily_digest(
        &self,
        channel_name: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<Option<ChannelDigest>> {
        let Some(_guard) = self.try_acquire() else {
            info!("Digest generation already in progress, skipping");
            return Ok(None);
        };

        self.generate_for_channel(channel_name, date).await
    }

    /// The per-channel pipeline, without guard handling
    async fn generate_for_channel(
        &self,
        channel_name: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<Option<ChannelDigest>> {
        let target_date = date.unwrap_or_else(utc_today);
        info!(
            "Generating daily digest for #{channel_name} on {}",
            date_string(target_date)
        );

        let Some(channel_id) = self.resolve_channel(channel_name).await else {
            info!("Channel #{channel_name} not found");
            return Ok(None);
        };

        // Cache takes precedence: digests for closed days are final
        if let Some(digest) = self.cache.digest(&channel_id, target_date).await {
            info!("Using cached digest for #{channel_name}");
            return Ok(Some(digest));
        }

        let messages = self.messages_for_date(&channel_id, target_date).await;
        if messages.is_empty() {
            info!(
                "No messages found for #{channel_name} on {}",
                date_string(target_date)
            );
            return Ok(None);
        }

        info!(
            "Processing {} messages from #{channel_name}",
            messages.len()
        );

        let summary = self.summarizer.summarize(&messages, channel_name).await?;

        let digest = ChannelDigest {
            channel_name: channel_name.to_owned(),
            date: date_string(target_date),
            message_count: messages.len(),
            summary,
            generated_at: Utc::now(),
            participants: extract_participants(&messages),
        };

        self.cache
            .store_digest(&channel_id, target_date, &digest)
            .await;

        info!("Daily digest generated for #{channel_name}");
        Ok(Some(digest))
    }

    /// Two-tier message retrieval: cached batch, else fetch and cache.
    ///
    /// Cached batches are returned as-is (already filtered and ordered).
    /// Empty fetch results are never cached.
    async fn messages_for_date(&self, channel_id: &str, date: NaiveDate) -> Vec<Message> {
        if let Some(batch) = self.cache.messages(channel_id, date).await {
            debug!("Using cached messages for {}", date_string(date));
            return batch;
        }

        let (oldest, latest) = day_bounds(date);
        let messages = self.fetcher.fetch_range(channel_id, oldest, latest).await;

        if !messages.is_empty() {
            self.cache.store_messages(channel_id, date, &messages).await;
        }

        messages
    }

    /// Generate digests for all watched channels and post each back to its
    /// channel. One channel's failure never aborts the others.
    ///
    /// Holds the generation slot for the whole run; a run that finds the
    /// slot taken is skipped entirely.
    pub async fn generate_and_send_daily_digests(&self) {
        let Some(_guard) = self.try_acquire() else {
            info!("Digest generation already in progress, skipping scheduled run");
            return;
        };

        info!(
            "Starting daily digest generation for {} channels",
            self.config.watched_channels.len()
        );

        let runs = self.config.watched_channels.iter().map(|channel_name| {
            let channel_name = channel_name.as_str();
            async move {
                match self.generate_for_channel(channel_name, None).await {
                    Ok(Some(digest)) => {
                        if let Err(e) = self.send_digest(channel_name, &digest).await {
                            error!("Failed to send digest to #{channel_name}: {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!("Failed to generate digest for #{channel_name}: {e}");
                    }
                }
            }
        });

        futures_util::future::join_all(runs).await;
        info!("Daily digest generation completed");
    }

    /// Cached digests for the last `days` days, newest first.
    ///
    /// Cache-only: missing days are silently omitted, nothing is
    /// regenerated, and the generation slot is not touched.
    pub async fn get_digest_history(&self, channel_name: &str, days: u32) -> Vec<ChannelDigest> {
        let Some(channel_id) = self.resolve_channel(channel_name).await else {
            return Vec::new();
        };

        let today = utc_today();
        let mut digests = Vec::new();

        for offset in 0..days {
            let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) else {
                continue;
            };
            if let Some(digest) = self.cache.digest(&channel_id, date).await {
                digests.push(digest);
            }
        }

        // YYYY-MM-DD compares lexicographically in date order
        digests.sort_by(|a, b| b.date.cmp(&a.date));
        digests
    }

    /// Summarize the channel's most recent messages on demand.
    ///
    /// Bypasses the cache and the generation slot. Summarization failures
    /// propagate so interactive callers see the error.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is unknown or summarization fails.
    pub async fn quick_recap(&self, channel_name: &str) -> AppResult<String> {
        info!("Generating quick recap for #{channel_name}");

        let channel_id = self
            .resolve_channel(channel_name)
            .await
            .ok_or_else(|| AppError::not_found(format!("channel #{channel_name}")))?;

        let messages = self
            .fetcher
            .recent_messages(&channel_id, RECAP_MESSAGE_LIMIT)
            .await;

        if messages.is_empty() {
            return Ok("No recent messages found in this channel.".to_owned());
        }

        self.summarizer.quick_recap(&messages, channel_name).await
    }

    /// Resolve a channel name, degrading platform errors to absent
    async fn resolve_channel(&self, channel_name: &str) -> Option<String> {
        match self.slack.resolve_channel_id(channel_name).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Resolving channel #{channel_name} failed: {e}");
                None
            }
        }
    }

    /// Post a finished digest back to its channel with Block Kit formatting
    async fn send_digest(&self, channel_name: &str, digest: &ChannelDigest) -> AppResult<()> {
        let Some(channel_id) = self.resolve_channel(channel_name).await else {
            return Err(AppError::not_found(format!("channel #{channel_name}")));
        };

        let blocks = serde_json::json!([
            {
                "type": "header",
                "text": { "type": "plain_text", "text": format!("Daily Digest for #{channel_name}") }
            },
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": digest.summary }
            },
            { "type": "divider" },
            {
                "type": "context",
                "elements": [
                    {
                        "type": "mrkdwn",
                        "text": format!(
                            "{} messages from {} participants on {}",
                            digest.message_count,
                            digest.participants.len(),
                            digest.date
                        )
                    }
                ]
            }
        ]);

        self.slack
            .post_message(
                &channel_id,
                &format!("Daily Digest for #{channel_name}"),
                Some(blocks),
            )
            .await?;

        info!("Daily digest sent to #{channel_name}");
        Ok(())
    }
}

/// Per-author message counts for a batch, sorted descending by count with
/// ties broken by first appearance in the batch.
///
/// Invariant: the counts sum to the batch length.
#[must_use]
pub fn extract_participants(messages: &[Message]) -> Vec<Participant> {
    // Vec preserves first-seen order; batches are small (bounded by the
    // per-digest cap), so the linear scan is fine.
    let mut counts: Vec<(String, usize)> = Vec::new();

    for msg in messages {
        if let Some(entry) = counts.iter_mut().find(|(user, _)| *user == msg.user) {
            entry.1 += 1;
        } else {
            counts.push((msg.user.clone(), 1));
        }
    }

    // Stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .map(|(user, message_count)| Participant {
            user,
            message_count,
        })
        .collect()
}
