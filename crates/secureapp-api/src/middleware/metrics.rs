//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Access gate outcomes are counted by the gate itself. The
//! active-session gauge is refreshed on each `/metrics` scrape.
//!
//! Paths are deliberately not a label: product ids and unrouted paths are
//! caller-controlled and would grow the series without bound.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use secureapp_core::Decision;

use crate::error::AppError;
use crate::state::AppState;

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
    access_decisions_total: IntCounterVec,
    active_sessions: IntGauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("secureapp_http_requests_total", "Total HTTP requests"),
            &["method", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "secureapp_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("secureapp_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "status"],
        )
        .expect("metric can be created");

        let access_decisions_total = IntCounterVec::new(
            Opts::new(
                "secureapp_access_decisions_total",
                "Access gate decisions by outcome",
            ),
            &["decision"],
        )
        .expect("metric can be created");

        let active_sessions =
            IntGauge::new("secureapp_active_sessions", "Sessions currently established")
                .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(access_decisions_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(active_sessions.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                access_decisions_total,
                active_sessions,
            }),
        }
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counters(&self.inner.http_requests_total)
    }

    /// Total error count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counters(&self.inner.http_errors_total)
    }

    /// Count of gate decisions with the given outcome.
    pub fn decisions(&self, decision: Decision) -> u64 {
        self.inner
            .access_decisions_total
            .with_label_values(&[decision.as_str()])
            .get()
    }

    /// Record one access gate outcome.
    pub fn record_decision(&self, decision: Decision) {
        self.inner
            .access_decisions_total
            .with_label_values(&[decision.as_str()])
            .inc();
    }

    fn record_request(&self, method: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, &status_str])
                .inc();
        }
    }

    pub fn active_sessions(&self) -> &IntGauge {
        &self.inner.active_sessions
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counters(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(&method, response.status().as_u16(), start.elapsed().as_secs_f64());
    }

    response
}

/// GET /metrics — Prometheus scrape endpoint.
pub async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Result<Response, AppError> {
    metrics.active_sessions().set(state.sessions.len() as i64);
    let body = metrics.gather_and_encode().map_err(AppError::Internal)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response())
}
