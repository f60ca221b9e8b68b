//! HTTP endpoint for webhook deliveries.
//!
//! - `POST /webhook` - GitHub deliveries
//! - `GET /health` - liveness probe

use crate::webhook::{WebhookEvent, WebhookHandler, parse_payload};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

pub const EVENT_HEADER: &str = "x-github-event";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

pub fn router(handler: Arc<WebhookHandler>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(handler)
}

async fn health() -> &'static str {
    "ok"
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn webhook(State(handler): State<Arc<WebhookHandler>>, headers: HeaderMap, body: Bytes) -> Response {
    if handler.verify(header(&headers, SIGNATURE_HEADER), &body).is_err() {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "permission denied" }))).into_response();
    }

    let event_type = header(&headers, EVENT_HEADER).unwrap_or_default();
    let content_type = header(&headers, "content-type");
    info!(event = event_type, content_type = content_type.unwrap_or(""), "Webhook received");

    let payload = match parse_payload(content_type, &body) {
        Ok(payload) => payload,
        Err(e) => {
            let preview = String::from_utf8_lossy(&body[..body.len().min(200)]).into_owned();
            error!(body_length = body.len(), body_preview = %preview, "Invalid webhook payload");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
    };

    match WebhookEvent::from_payload(event_type, &payload) {
        Some(event) => {
            if let Err(e) = handler.dispatch(&event).await {
                error!(error = %e, "Webhook dispatch failed");
            }
        }
        None => info!(event = event_type, "Unhandled webhook event"),
    }

    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

/// Serve the webhook endpoint on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    handler: Arc<WebhookHandler>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind webhook endpoint to {addr}"))?;
    let local = listener.local_addr().context("Failed to read bound address")?;
    info!(%local, "Webhook endpoint listening");

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Webhook server failed")
}
