// ABOUTME: Server binary: wires config, cache, platform clients, scheduler, and HTTP surface
// ABOUTME: Runs until SIGINT/SIGTERM, then shuts down scheduler and cache gracefully
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Slackfly Server Binary
//!
//! Starts the digest service: loads environment configuration, connects the
//! configured cache backend, schedules the daily batch run, and serves the
//! HTTP control surface.

use anyhow::{Context, Result};
use clap::Parser;
use slackfly::{
    cache::factory::Cache,
    config::ServerConfig,
    digest::{DigestCache, DigestService},
    llm::OpenAiSummarizer,
    logging,
    routes::{router, AppState},
    scheduler::DigestScheduler,
    slack::SlackHttpClient,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "slackfly-server")]
#[command(about = "Slackfly - daily Slack channel digest service")]
struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting Slackfly");
    info!("{}", config.summary());

    // Cache backend per configuration; the rest of the system only sees
    // the facade, so dev/test runs work without any external store.
    let cache = Cache::from_settings(&config.cache);
    cache.connect().await?;

    let slack = Arc::new(SlackHttpClient::new(config.slack.bot_token.clone())?);
    let summarizer = Arc::new(OpenAiSummarizer::new(
        config.openai.api_key.clone(),
        config.openai.model.clone(),
        config.openai.max_tokens,
    )?);

    let service = Arc::new(DigestService::new(
        slack,
        summarizer,
        DigestCache::new(cache.clone()),
        config.digest.clone(),
    ));

    let scheduler = Arc::new(DigestScheduler::new(
        service.clone(),
        &config.digest.schedule,
    )?);
    scheduler.start();

    let state = AppState {
        service,
        scheduler: scheduler.clone(),
        config: Arc::new(config.clone()),
        started_at: Instant::now(),
    };

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    scheduler.stop();
    cache.disconnect().await;
    info!("Graceful shutdown completed");

    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
