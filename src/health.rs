//! Health server for Kubernetes probes and Prometheus metrics
//!
//! Provides HTTP endpoints for:
//! - `/healthz` - Liveness probe
//! - `/readyz` - Readiness probe (registry built and webhook wired)
//! - `/metrics` - Prometheus metrics

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Labels of an admission decision
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AdmissionLabels {
    pub kind: String,
    pub operation: String,
    /// `"true"` or `"false"`
    pub allowed: String,
}

/// Labels of the latency histogram
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct LatencyLabels {
    pub kind: String,
    pub operation: String,
}

/// Shared metrics state
pub struct Metrics {
    /// Admission requests by outcome
    pub requests_total: Family<AdmissionLabels, Counter>,
    /// Time spent deciding a request
    pub request_duration_seconds: Family<LatencyLabels, Histogram>,
    /// Size of the field-tag registry
    pub registered_tags: Gauge,

    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<AdmissionLabels, Counter>::default();
        registry.register(
            "chaos_admission_requests",
            "Total number of admission requests",
            requests_total.clone(),
        );

        let request_duration_seconds =
            Family::<LatencyLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.0001, 2.0, 15))
            });
        registry.register(
            "chaos_admission_request_duration_seconds",
            "Duration of admission decisions in seconds",
            request_duration_seconds.clone(),
        );

        let registered_tags = Gauge::default();
        registry.register(
            "chaos_admission_registered_tags",
            "Number of field tags in the validation registry",
            registered_tags.clone(),
        );

        Self {
            requests_total,
            request_duration_seconds,
            registered_tags,
            registry,
        }
    }

    /// Record one admission decision
    pub fn record_request(&self, kind: &str, operation: &str, allowed: bool, duration_secs: f64) {
        self.requests_total
            .get_or_create(&AdmissionLabels {
                kind: kind.to_string(),
                operation: operation.to_string(),
                allowed: allowed.to_string(),
            })
            .inc();
        self.request_duration_seconds
            .get_or_create(&LatencyLabels {
                kind: kind.to_string(),
                operation: operation.to_string(),
            })
            .observe(duration_secs);
    }

    pub fn set_registered_tags(&self, count: usize) {
        self.registered_tags
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Encode metrics to Prometheus text format
    ///
    /// Returns an empty string if encoding fails.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = encode(&mut buffer, &self.registry) {
            tracing::error!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether admission requests can be served
    pub ready: RwLock<bool>,
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn metrics(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve health and metrics endpoints on `0.0.0.0:port`
pub async fn run_health_server(state: Arc<HealthState>, port: u16) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "Health server listening");

    axum::serve(listener, app).await
}
