//! HTTP handlers for the analytics endpoints.
//!
//! Both endpoints mirror the pipeline's two halves: `track` feeds the
//! write path (store + conversion relay fan-out) and `dashboard-summary`
//! serves the read path (KPI aggregation over the store).

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Extension, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::trace::TraceLayer;

use cartpulse_core::{DashboardSummary, Identity, RequestContext, TrackAck, TrackRequest};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/analytics/track", post(track))
        .route("/api/analytics/dashboard-summary", get(dashboard_summary))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Ingest one client event.
///
/// Always acknowledges with HTTP 200: a broken analytics pipeline must
/// never surface as a storefront error. Failures are logged and reported
/// in the ack body instead.
async fn track(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    identity: Option<Extension<Identity>>,
    headers: HeaderMap,
    payload: Result<Json<TrackRequest>, JsonRejection>,
) -> (StatusCode, Json<TrackAck>) {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected malformed track request");
            return (StatusCode::OK, Json(TrackAck::error("Logged internally")));
        }
    };

    let ctx = RequestContext {
        ip: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
        user_agent: header_str(&headers, header::USER_AGENT),
        fbp: None,
        fbc: None,
        identity: identity.map(|Extension(id)| id),
    };

    // Run the fan-out on its own task so a client hanging up mid-request
    // cannot cancel the store write.
    let ingest = state.ingest.clone();
    let ack = match tokio::spawn(async move { ingest.ingest(req, ctx).await }).await {
        Ok(ack) => ack,
        Err(err) => {
            tracing::error!(error = %err, "Ingest task panicked");
            TrackAck::error("Logged internally")
        }
    };

    (StatusCode::OK, Json(ack))
}

/// Aggregate dashboard KPIs and the recent activity feed.
///
/// Requires the admin bearer token from the server config.
async fn dashboard_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardSummary>, (StatusCode, Json<serde_json::Value>)> {
    require_admin(&state, &headers)?;

    match state.dashboard.compute_summary(Utc::now()).await {
        Ok(summary) => Ok(Json(summary)),
        Err(err) => {
            tracing::error!(error = %err, "Dashboard aggregation failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Analytics failed" })),
            ))
        }
    }
}

fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthorized" })),
        )
    };

    let expected = state.admin_token.as_deref().ok_or_else(unauthorized)?;
    let provided = header_str(headers, header::AUTHORIZATION);
    let provided = provided
        .as_deref()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;

    // Timing-safe: a byte-wise mismatch must not short-circuit
    if constant_time_eq::constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(unauthorized())
    }
}

/// Resolve the client address, preferring the first hop recorded by a
/// reverse proxy over the raw socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = header_str(headers, header::HeaderName::from_static("x-forwarded-for"))
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
