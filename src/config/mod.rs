// ABOUTME: Configuration management modules for environment-based settings
// ABOUTME: Exposes the typed ServerConfig loaded once at startup
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Environment-based configuration loading
pub mod environment;

pub use environment::{
    CacheBackend, CacheSettings, DigestConfig, Environment, OpenAiConfig, ServerConfig,
    SlackConfig,
};
