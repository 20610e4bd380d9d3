// ABOUTME: Summarization service abstraction for digest and recap generation
// ABOUTME: Treats the language model as an opaque text-in/text-out collaborator
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Summarization Abstraction
//!
//! [`Summarizer`] is the pipeline's view of the language model: an ordered
//! message batch and a channel name in, prose out. Failures here are hard
//! errors (quota, network) and propagate to the caller, unlike the fetch
//! layer's fail-empty policy.

/// OpenAI chat-completions implementation
pub mod openai;

pub use openai::OpenAiSummarizer;

use crate::errors::AppResult;
use crate::models::Message;

/// Text-generation collaborator used by the digest pipeline
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a structured daily summary of an ordered message batch
    async fn summarize(&self, messages: &[Message], channel_name: &str) -> AppResult<String>;

    /// Produce a short recap of recent messages
    async fn quick_recap(&self, messages: &[Message], channel_name: &str) -> AppResult<String>;
}
