// ABOUTME: HTTP control surface: health, manual trigger, history, recap, and config endpoints
// ABOUTME: Thin axum handlers over the digest orchestrator, JSON shapes kept wire-stable
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Control Surface
//!
//! Thin HTTP layer over [`DigestService`]. The response envelopes
//! (`success`/`data`/`error`/`message`) and field names are part of the
//! outward contract and must stay stable.

use crate::config::ServerConfig;
use crate::constants::{digest::DEFAULT_HISTORY_DAYS, service};
use crate::digest::DigestService;
use crate::errors::AppError;
use crate::scheduler::DigestScheduler;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// The digest orchestrator
    pub service: Arc<DigestService>,
    /// Scheduler, for task status reporting
    pub scheduler: Arc<DigestScheduler>,
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

/// Standard API response envelope
#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        })
    }

    fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
        })
    }
}

/// Convert a pipeline error into the envelope with its HTTP status
fn error_response(error: &AppError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Json(ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(error.to_string()),
        message: None,
    });
    (status, body).into_response()
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/digest/trigger", post(trigger_digest))
        .route("/api/digest/:channel", get(digest_history))
        .route("/api/recap/:channel", post(recap))
        .route("/api/config", get(get_config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": service::NAME,
        "description": "Daily channel digest service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "triggerDigest": "POST /api/digest/trigger",
            "getDigests": "GET /api/digest/:channel",
            "recap": "POST /api/recap/:channel",
            "config": "/api/config",
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache_healthy = state.service.cache().store().health_check().await.is_ok();
    let status = if cache_healthy { "ok" } else { "degraded" };

    Json(serde_json::json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "cache": {
            "backend": state.service.cache().store().backend_name(),
            "healthy": cache_healthy,
        },
        "tasks": {
            "dailyDigest": state.scheduler.status(),
        },
    }))
}

/// Manual digest trigger request body
#[derive(Debug, Default, Deserialize)]
struct TriggerRequest {
    channel: Option<String>,
    date: Option<String>,
}

async fn trigger_digest(
    State(state): State<AppState>,
    body: Option<Json<TriggerRequest>>,
) -> Response {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let Some(channel) = request.channel else {
        // No channel: run the full scheduled batch
        state.service.generate_and_send_daily_digests().await;
        return ApiResponse::<()>::message("Daily digest generation triggered for all channels")
            .into_response();
    };

    let date = match request.date.as_deref().map(parse_date).transpose() {
        Ok(date) => date,
        Err(e) => return error_response(&e),
    };

    match state.service.generate_daily_digest(&channel, date).await {
        Ok(digest) => ApiResponse::ok(digest).into_response(),
        Err(e) => error_response(&e),
    }
}

/// History query parameters
#[derive(Debug, Deserialize)]
struct HistoryQuery {
    days: Option<u32>,
}

async fn digest_history(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    let digests = state.service.get_digest_history(&channel, days).await;
    ApiResponse::ok(digests).into_response()
}

async fn recap(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    match state.service.quick_recap(&channel).await {
        Ok(recap) => ApiResponse::ok(recap).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn get_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "watchedChannels": state.config.digest.watched_channels,
        "schedule": state.config.digest.schedule,
        "maxMessages": state.config.digest.max_messages_per_digest,
        "environment": state.config.environment.to_string(),
    }))
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| AppError::invalid_input(format!("Invalid date '{raw}' (want YYYY-MM-DD): {e}")))
}
