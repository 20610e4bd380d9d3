// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Environment-based configuration management for production deployment

use crate::constants::{cache, digest, llm};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Environment type for deployment-specific behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Cache backend selection, decided once at startup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local table with a periodic expiry sweep
    #[default]
    Memory,
    /// Networked Redis store delegating TTL to the server
    Redis,
}

impl CacheBackend {
    /// Parse from string with fallback to the in-process backend
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "redis" => Self::Redis,
            _ => Self::Memory,
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

/// Slack API configuration
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) used for all Web API calls
    pub bot_token: String,
}

/// Summarization service configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for the completion endpoint
    pub api_key: String,
    /// Model used for digest summaries
    pub model: String,
    /// Completion budget for a daily summary
    pub max_tokens: u32,
}

/// Cache backend settings
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Which backend the factory should build
    pub backend: CacheBackend,
    /// Redis connection URL (required for the Redis backend)
    pub redis_url: String,
    /// Maximum entries held by the in-process backend
    pub max_entries: usize,
    /// Interval between expiry sweeps of the in-process backend
    pub sweep_interval_secs: u64,
    /// Enable the background sweep task (disabled in tests)
    pub enable_background_sweep: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379".to_owned(),
            max_entries: cache::DEFAULT_CACHE_MAX_ENTRIES,
            sweep_interval_secs: cache::DEFAULT_SWEEP_INTERVAL_SECS,
            enable_background_sweep: true,
        }
    }
}

/// Digest pipeline configuration
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Channels included in scheduled batch runs
    pub watched_channels: Vec<String>,
    /// Hard cap on messages collected per digest
    pub max_messages_per_digest: usize,
    /// Daily trigger time, `HH:MM` UTC
    pub schedule: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            watched_channels: digest::DEFAULT_WATCHED_CHANNELS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            max_messages_per_digest: digest::DEFAULT_MAX_MESSAGES,
            schedule: digest::DEFAULT_SCHEDULE.to_owned(),
        }
    }
}

/// Complete server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the control surface
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Slack API settings
    pub slack: SlackConfig,
    /// Summarization settings
    pub openai: OpenAiConfig,
    /// Cache backend settings
    pub cache: CacheSettings,
    /// Digest pipeline settings
    pub digest: DigestConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable (`SLACK_BOT_TOKEN`,
    /// `OPENAI_API_KEY`) is missing or a numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let slack = SlackConfig {
            bot_token: env::var("SLACK_BOT_TOKEN")
                .context("SLACK_BOT_TOKEN environment variable is required")?,
        };

        let openai = OpenAiConfig {
            api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY environment variable is required")?,
            model: env_var_or("OPENAI_MODEL", llm::DEFAULT_MODEL),
            max_tokens: parse_env_or("SUMMARY_MAX_TOKENS", llm::DEFAULT_MAX_TOKENS)?,
        };

        let cache = CacheSettings {
            backend: CacheBackend::from_str_or_default(&env_var_or("CACHE_BACKEND", "memory")),
            redis_url: env_var_or("REDIS_URL", "redis://localhost:6379"),
            max_entries: parse_env_or("CACHE_MAX_ENTRIES", cache::DEFAULT_CACHE_MAX_ENTRIES)?,
            sweep_interval_secs: parse_env_or(
                "CACHE_SWEEP_INTERVAL_SECS",
                cache::DEFAULT_SWEEP_INTERVAL_SECS,
            )?,
            enable_background_sweep: true,
        };

        let digest = DigestConfig {
            watched_channels: parse_channel_list(&env_var_or("WATCHED_CHANNELS", "")),
            max_messages_per_digest: parse_env_or(
                "MAX_MESSAGES_PER_DIGEST",
                digest::DEFAULT_MAX_MESSAGES,
            )?,
            schedule: env_var_or("DIGEST_SCHEDULE", digest::DEFAULT_SCHEDULE),
        };

        Ok(Self {
            http_port: parse_env_or("HTTP_PORT", 3000)?,
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            slack,
            openai,
            cache,
            digest,
        })
    }

    /// One-line configuration summary for startup logging.
    /// Never includes secrets.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} env={} cache={} model={} channels=[{}] schedule={} max_messages={}",
            self.http_port,
            self.environment,
            self.cache.backend,
            self.openai.model,
            self.digest.watched_channels.join(", "),
            self.digest.schedule,
            self.digest.max_messages_per_digest,
        )
    }
}

/// Read an environment variable with a default fallback
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse a typed environment variable, falling back to a default when unset
fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated channel list, trimming whitespace.
/// An empty input yields the default watched channels.
fn parse_channel_list(raw: &str) -> Vec<String> {
    let channels: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    if channels.is_empty() {
        digest::DEFAULT_WATCHED_CHANNELS
            .iter()
            .map(|s| (*s).to_owned())
            .collect()
    } else {
        channels
    }
}
