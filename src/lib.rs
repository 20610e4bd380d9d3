// ABOUTME: Main library entry point for the Slackfly digest service
// ABOUTME: Fetches, summarizes, and caches daily Slack channel digests
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Slackfly
//!
//! A daily channel digest service. On a schedule or on demand, it converts
//! a Slack channel's raw messages into a structured digest: a deduplicated,
//! chronologically ordered transcript summarized by a language model and
//! annotated with participant statistics, cached so repeated requests for
//! the same channel and day are served without re-fetching or
//! re-summarizing.
//!
//! ## Architecture
//!
//! - **cache**: key/value storage with TTLs behind one contract; in-memory
//!   and Redis backends chosen by configuration
//! - **slack**: chat-platform contract, Web API client, and the paginated
//!   message fetcher
//! - **llm**: summarization contract and the OpenAI implementation
//! - **digest**: the orchestrator and the channel/date cache policy
//! - **routes** / **scheduler**: thin control surface and daily trigger
//!
//! All calendar handling is UTC: digest dates, fetch-range day boundaries,
//! and the live-day/closed-day cache freshness tiers.

/// Cache abstraction layer with pluggable backends
pub mod cache;

/// Configuration management
pub mod config;

/// Application constants and default values
pub mod constants;

/// Digest pipeline: orchestration and cache policy
pub mod digest;

/// Unified error handling system
pub mod errors;

/// Summarization service abstraction
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// Common data models
pub mod models;

/// HTTP control surface
pub mod routes;

/// Daily digest scheduler
pub mod scheduler;

/// Slack platform integration
pub mod slack;
