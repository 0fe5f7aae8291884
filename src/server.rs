// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP surface
//!
//! Serves the Prometheus text encoding plus small health, readiness, and
//! status endpoints. Handlers only read shared state; the sampling loop
//! is the sole writer.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::encode_metrics;
use crate::sampler::SamplerState;

/// Application state shared across handlers
pub struct AppState {
    pub sampler: Arc<SamplerState>,
    pub device: String,
    pub delay_secs: f64,
    pub start_time: Instant,
}

/// Build the exporter's router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>DigiTemp Exporter</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>DigiTemp Exporter</h1>
    <p>Prometheus exporter for a DS18B20 temperature sensor on a serial 1-Wire adapter.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><a href="/ready">/ready</a> - Readiness check</div>
        <div class="endpoint"><a href="/status">/status</a> - Status information (JSON)</div>
    </div>

    <h2>Metrics</h2>
    <ul>
        <li><code>digitemp_temperature</code> - Temperature sensor reading in degrees Celsius</li>
    </ul>

    <p>The gauge holds the last successful reading; it is not reset while the
    sensor link is down. A frozen value with climbing failure counters on
    <a href="/status">/status</a> means the link needs attention.</p>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        encode_metrics(),
    )
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler.
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.sampler.running.load(Ordering::SeqCst) {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Sampler stopped")
    }
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    device: String,
    delay_secs: f64,
    sampler: SamplerStatus,
}

/// Sampling loop status information.
#[derive(Serialize)]
struct SamplerStatus {
    running: bool,
    connected: bool,
    ticks: u64,
    connect_failures: u64,
    read_failures: u64,
}

impl SamplerStatus {
    fn snapshot(state: &SamplerState) -> Self {
        Self {
            running: state.running.load(Ordering::SeqCst),
            connected: state.connected.load(Ordering::Relaxed),
            ticks: state.ticks.load(Ordering::Relaxed),
            connect_failures: state.connect_failures.load(Ordering::Relaxed),
            read_failures: state.read_failures.load(Ordering::Relaxed),
        }
    }
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        device: state.device.clone(),
        delay_secs: state.delay_secs,
        sampler: SamplerStatus::snapshot(&state.sampler),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_counters() {
        let state = SamplerState::default();
        state.ticks.store(7, Ordering::Relaxed);
        state.read_failures.store(2, Ordering::Relaxed);

        let status = StatusResponse {
            version: "0.1.0".to_string(),
            uptime_secs: 12,
            device: "/dev/ttyUSB0".to_string(),
            delay_secs: 5.0,
            sampler: SamplerStatus::snapshot(&state),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["sampler"]["ticks"], 7);
        assert_eq!(json["sampler"]["read_failures"], 2);
        assert_eq!(json["sampler"]["running"], false);
        assert_eq!(json["device"], "/dev/ttyUSB0");
    }
}
