//! Request metrics for the catalog service.
//!
//! Metrics are recorded with the `metrics` crate macros against a
//! `PrometheusRecorder` owned by [`CatalogMetrics`] rather than a
//! process-wide recorder. Each router gets its own instance, so tests can
//! build isolated registries and inspect the rendered output.
//!
//! Provided metrics:
//! * `http_request_duration_seconds` (histogram, labels: method)
//! * `http_requests_total` (counter, labels: method, status)
//! * `http_not_found_requests_total` (counter, labels: method, path)
//! * `bookshelf_build_info` (gauge, labels: version)
//!
//! [`RequestTimer`] leverages `Drop` so a duration is recorded even when the
//! caller returns early.
use std::time::{Duration, Instant};

use metrics::{
    Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    with_local_recorder,
};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_NOT_FOUND_REQUESTS_TOTAL: &str = "http_not_found_requests_total";
pub const BUILD_INFO: &str = "bookshelf_build_info";

/// Histogram buckets (seconds) used when none are configured.
pub const DEFAULT_DURATION_BUCKETS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 20.0, 60.0];

/// Content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// An isolated metrics registry plus its exposition handle.
pub struct CatalogMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl CatalogMetrics {
    /// Build a registry using `duration_buckets` for the request duration
    /// histogram. Fails if the bucket list is empty.
    pub fn new(duration_buckets: &[f64]) -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
                duration_buckets,
            )?
            .build_recorder();
        let handle = recorder.handle();
        let metrics = Self { recorder, handle };
        metrics.describe();
        Ok(metrics)
    }

    fn describe(&self) {
        with_local_recorder(&self.recorder, || {
            describe_histogram!(
                HTTP_REQUEST_DURATION_SECONDS,
                Unit::Seconds,
                "HTTP request duration distribution."
            );
            describe_counter!(
                HTTP_REQUESTS_TOTAL,
                Unit::Count,
                "Count of all completed HTTP requests."
            );
            describe_counter!(
                HTTP_NOT_FOUND_REQUESTS_TOTAL,
                Unit::Count,
                "Count of HTTP requests that matched no route."
            );
            describe_gauge!(BUILD_INFO, "Version information about this binary.");
            gauge!(BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
        });
    }

    /// Record a completed request's duration.
    pub fn record_request_duration(&self, method: &str, duration: Duration) {
        with_local_recorder(&self.recorder, || {
            histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method.to_string())
                .record(duration.as_secs_f64());
        });
    }

    /// Increment the completed request counter.
    pub fn increment_request_total(&self, method: &str, status: u16) {
        with_local_recorder(&self.recorder, || {
            counter!(
                HTTP_REQUESTS_TOTAL,
                "method" => method.to_string(),
                "status" => status.to_string()
            )
            .increment(1);
        });
    }

    /// Increment the counter of requests that matched no route.
    pub fn increment_not_found(&self, method: &str, path: &str) {
        with_local_recorder(&self.recorder, || {
            counter!(
                HTTP_NOT_FOUND_REQUESTS_TOTAL,
                "method" => method.to_string(),
                "path" => path.to_string()
            )
            .increment(1);
        });
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// RAII helper measuring request duration.
pub struct RequestTimer<'a> {
    metrics: &'a CatalogMetrics,
    method: &'a str,
    start: Instant,
}

impl<'a> RequestTimer<'a> {
    pub fn new(metrics: &'a CatalogMetrics, method: &'a str) -> Self {
        Self {
            metrics,
            method,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.metrics
            .record_request_duration(self.method, self.start.elapsed());
    }
}
