//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain gauges (nodes by type, products, outstanding debt) are
//! refreshed on each `/metrics` scrape; see [`ApiMetrics::observe_state`].

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use netnode_core::NodeType;
use prometheus::core::Collector;
use prometheus::{Encoder, Gauge, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::state::AppState;

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    nodes_total: GaugeVec,
    products_total: Gauge,
    outstanding_debt: Gauge,
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
            Opts::new("netnode_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "netnode_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("netnode_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let nodes_total = GaugeVec::new(
            Opts::new("netnode_nodes_total", "Network nodes by type"),
            &["node_type"],
        )
        .expect("metric can be created");

        let products_total = Gauge::new("netnode_products_total", "Total products")
            .expect("metric can be created");

        let outstanding_debt = Gauge::new(
            "netnode_outstanding_debt",
            "Sum of debt owed across all nodes",
        )
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
            .register(Box::new(nodes_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(products_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(outstanding_debt.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                nodes_total,
                products_total,
                outstanding_debt,
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

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Refresh domain gauges from the current stores.
    pub fn observe_state(&self, state: &AppState) {
        let nodes = state.nodes.list();
        for node_type in NodeType::ALL {
            let count = nodes.iter().filter(|n| n.node_type == node_type).count();
            self.inner
                .nodes_total
                .with_label_values(&[node_type.as_str()])
                .set(count as f64);
        }

        self.inner.products_total.set(state.products.len() as f64);

        let debt: Decimal = nodes.iter().map(|n| n.debt.amount()).sum();
        self.inner
            .outstanding_debt
            .set(debt.to_f64().unwrap_or(f64::MAX));
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

/// Replace UUID path segments with `{id}` to keep label cardinality bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else if segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use netnode_core::{Debt, NetworkNode, NodeFields, NodeId};

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn request_and_error_counts_independent() {
        let m = ApiMetrics::new();
        for _ in 0..5 {
            m.record_request("GET", "/api/network-nodes/", 200, 0.01);
        }
        m.record_request("GET", "/api/network-nodes/{id}/", 404, 0.1);
        m.record_request("POST", "/api/network-nodes/", 400, 0.05);
        assert_eq!(m.requests(), 7);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn concurrent_increments_are_safe() {
        let m = ApiMetrics::new();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        m.record_request("GET", "/ok", 200, 0.001);
                        m.record_request("GET", "/err", 500, 0.001);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(m.requests(), 8_000);
        assert_eq!(m.errors(), 4_000);
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let m = ApiMetrics::new();
        let clone = m.clone();
        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(clone.requests(), 1);
    }

    #[test]
    fn normalize_path_replaces_uuids() {
        assert_eq!(
            normalize_path("/api/network-nodes/550e8400-e29b-41d4-a716-446655440000/clear_debt/"),
            "/api/network-nodes/{id}/clear_debt/"
        );
        assert_eq!(
            normalize_path("/api/products/550e8400e29b41d4a716446655440000/"),
            "/api/products/{id}/"
        );
        assert_eq!(normalize_path("/api/network-nodes/"), "/api/network-nodes/");
    }

    #[test]
    fn domain_gauges_reflect_state() {
        let state = AppState::new();
        let new = NodeFields {
            name: Some("Plant".into()),
            node_type: Some("factory".into()),
            email: Some("plant@example.com".into()),
            country: Some("Russia".into()),
            city: Some("Moscow".into()),
            street: Some("Main".into()),
            house_number: Some("1".into()),
        }
        .into_new(None, "250.75".parse::<Debt>().unwrap())
        .unwrap();
        let node = NetworkNode::create(NodeId::new(), new, Utc::now());
        state.nodes.insert(node.id, node);

        let m = ApiMetrics::new();
        m.observe_state(&state);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("netnode_nodes_total{node_type=\"factory\"} 1"));
        assert!(output.contains("netnode_nodes_total{node_type=\"retail\"} 0"));
        assert!(output.contains("netnode_products_total 0"));
        assert!(output.contains("netnode_outstanding_debt 250.75"));
    }
}
