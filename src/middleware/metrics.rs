//! Prometheus metrics
//!
//! Every metric lives in a per-application `Registry` (not the global one) so
//! tests can build as many apps as they like.

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

use crate::services::TierMirrorReport;

pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    http_duration: HistogramVec,
    sponsors_requests: IntCounterVec,
    tier_mirror_changes: IntCounterVec,
    aggregation_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("docs_sponsors".to_string()), None)?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests by route and status"),
            &["method", "route", "status"],
        )?;
        let http_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency"),
            &["method", "route"],
        )?;
        let sponsors_requests = IntCounterVec::new(
            Opts::new("sponsors_requests_total", "Sponsor aggregations by outcome"),
            &["outcome"],
        )?;
        let tier_mirror_changes = IntCounterVec::new(
            Opts::new("tier_mirror_changes_total", "Tier mirror writes by kind"),
            &["kind"],
        )?;
        let aggregation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "aggregation_duration_seconds",
                "Duration of a full sponsor aggregation, upstream calls included",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_duration.clone()))?;
        registry.register(Box::new(sponsors_requests.clone()))?;
        registry.register(Box::new(tier_mirror_changes.clone()))?;
        registry.register(Box::new(aggregation_duration.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_duration,
            sponsors_requests,
            tier_mirror_changes,
            aggregation_duration,
        })
    }

    /// Record the outcome (`ok` or an `error.type`) of a sponsor aggregation
    pub fn record_aggregation(&self, outcome: &str, seconds: f64) {
        self.sponsors_requests.with_label_values(&[outcome]).inc();
        self.aggregation_duration.observe(seconds);
    }

    pub fn record_tier_mirror(&self, report: &TierMirrorReport) {
        for (kind, count) in [
            ("updated", report.updated),
            ("destroyed", report.destroyed),
            ("created", report.created),
        ] {
            if count > 0 {
                self.tier_mirror_changes
                    .with_label_values(&[kind])
                    .inc_by(count as u64);
            }
        }
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// `GET /metrics`
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Middleware counting requests per matched route
pub async fn track_metrics(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response<Body> {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics
        .http_requests
        .with_label_values(&[method.as_str(), route.as_str(), status.as_str()])
        .inc();
    metrics
        .http_duration
        .with_label_values(&[method.as_str(), route.as_str()])
        .observe(start.elapsed().as_secs_f64());

    response
}
