//! Request metrics in the Prometheus text format.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RequestLabels {
    method: String,
    route: String,
    status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RouteLabels {
    method: String,
    route: String,
}

type LatencyFamily = Family<RouteLabels, Histogram, fn() -> Histogram>;

fn latency_histogram() -> Histogram {
    // 1ms .. ~16s
    Histogram::new(exponential_buckets(0.001, 2.0, 15))
}

/// Owns the registry; clones share the same series.
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Arc<Registry>,
    requests: Family<RequestLabels, Counter>,
    latency: LatencyFamily,
}

impl ApiMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("forum");
        let requests = Family::<RequestLabels, Counter>::default();
        let latency = LatencyFamily::new_with_constructor(latency_histogram);

        registry.register("http_requests", "HTTP requests by route and status", requests.clone());
        registry.register(
            "http_request_duration_seconds",
            "HTTP request latency by route",
            latency.clone(),
        );

        Self { registry: Arc::new(registry), requests, latency }
    }

    pub fn observe(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        self.requests
            .get_or_create(&RequestLabels {
                method: method.to_owned(),
                route: route.to_owned(),
                status: status.to_string(),
            })
            .inc();
        self.latency
            .get_or_create(&RouteLabels { method: method.to_owned(), route: route.to_owned() })
            .observe(elapsed.as_secs_f64());
    }

    pub fn encode(&self) -> Result<String, fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_requests_show_up_in_exposition() {
        let metrics = ApiMetrics::new();
        metrics.observe("GET", "/api/thread/{slug_or_id}/posts", 200, Duration::from_millis(3));
        metrics.observe("GET", "/api/thread/{slug_or_id}/posts", 200, Duration::from_millis(5));

        let body = metrics.encode().unwrap();
        assert!(body.contains("forum_http_requests_total"));
        assert!(body.contains(r#"route="/api/thread/{slug_or_id}/posts""#));
        assert!(body.contains(r#"status="200""#));
        assert!(body.contains("forum_http_request_duration_seconds_count"));
    }

    #[test]
    fn clones_share_series() {
        let metrics = ApiMetrics::new();
        metrics.clone().observe("POST", "/api/service/clear", 200, Duration::ZERO);
        assert!(metrics.encode().unwrap().contains("/api/service/clear"));
    }
}
