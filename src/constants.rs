// ABOUTME: Application constants and default configuration values
// ABOUTME: Centralizes cache TTL policy, pagination limits, and service identity
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Application-wide constants

/// Service identity for logging and the control surface
pub mod service {
    /// Service name used in structured logs and the root endpoint
    pub const NAME: &str = "slackfly";
}

/// Cache TTL policy and in-process backend tuning
pub mod cache {
    /// TTL for a message batch whose date is the current UTC day.
    /// Short because the day is still accumulating messages.
    pub const TTL_MESSAGES_TODAY_SECS: u64 = 3600;

    /// TTL for a message batch of a past, closed day
    pub const TTL_MESSAGES_CLOSED_DAY_SECS: u64 = 86_400;

    /// TTL for a finished digest
    pub const TTL_DIGEST_SECS: u64 = 604_800;

    /// Maximum number of entries in the in-process cache backend
    pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

    /// Interval between background sweeps of expired in-process entries
    pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

    /// Namespace prefix applied to all Redis keys
    pub const CACHE_KEY_PREFIX: &str = "slackfly:";
}

/// Slack Web API limits and defaults
pub mod slack {
    /// Base URL of the Slack Web API
    pub const API_BASE_URL: &str = "https://slack.com/api";

    /// Page size requested from `conversations.history`
    pub const HISTORY_PAGE_LIMIT: u32 = 200;

    /// Number of recent messages fetched for a quick recap
    pub const RECAP_MESSAGE_LIMIT: u32 = 50;

    /// Request timeout for Slack API calls
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Digest pipeline defaults
pub mod digest {
    /// Default hard cap on messages collected per digest
    pub const DEFAULT_MAX_MESSAGES: usize = 100;

    /// Default number of days returned by the history lookup
    pub const DEFAULT_HISTORY_DAYS: u32 = 7;

    /// Default daily schedule (UTC wall clock, HH:MM)
    pub const DEFAULT_SCHEDULE: &str = "17:00";

    /// Default channels watched for scheduled digests
    pub const DEFAULT_WATCHED_CHANNELS: &[&str] = &["standup", "project-x"];
}

/// Summarization service defaults
pub mod llm {
    /// Base URL of the OpenAI-compatible completion API
    pub const API_BASE_URL: &str = "https://api.openai.com/v1";

    /// Default model used for digest summaries
    pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

    /// Default completion budget for a daily summary
    pub const DEFAULT_MAX_TOKENS: u32 = 500;

    /// Completion budget for a quick recap
    pub const RECAP_MAX_TOKENS: u32 = 300;

    /// Sampling temperature for summaries
    pub const TEMPERATURE: f32 = 0.3;

    /// Request timeout for completion calls
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
}
