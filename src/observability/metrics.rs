//! Metrics collection and exposition.
//!
//! # Metrics
//! - `screego_http_requests_total` (counter): requests by method and status
//! - `screego_http_request_duration_seconds` (histogram): latency distribution
//! - `screego_sessions_active` (gauge): connected WebSocket sessions
//! - `screego_rooms_active` (gauge): open rooms

use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Renders the Prometheus exposition text for `/metrics`.
#[derive(Clone)]
pub struct MetricsExporter {
    handle: PrometheusHandle,
}

impl MetricsExporter {
    /// Install the process-wide recorder. Only one recorder can exist per
    /// process, so this is called by the bootstrap and nowhere else.
    pub fn install() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl From<PrometheusHandle> for MetricsExporter {
    fn from(handle: PrometheusHandle) -> Self {
        Self { handle }
    }
}

/// Record a finished HTTP request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "screego_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("screego_http_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn set_sessions_active(count: usize) {
    metrics::gauge!("screego_sessions_active").set(count as f64);
}

pub fn set_rooms_active(count: usize) {
    metrics::gauge!("screego_rooms_active").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exporter_renders_local_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let exporter = MetricsExporter::from(recorder.handle());
        metrics::with_local_recorder(&recorder, || {
            record_request("GET", 200, Instant::now());
        });
        let text = exporter.render();
        assert!(text.contains("screego_http_requests_total"));
        assert!(text.contains("status=\"200\""));
    }
}
