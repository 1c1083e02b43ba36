//! Prometheus metrics exposition, served on `/metrics`:
//!
//! - `proxy_requests_total` (counter): labels `status`, `route`
//! - `proxy_request_duration_seconds` (histogram): label `route`
//! - `proxy_upstream_errors_total` (counter): label `error_type`
//! - `proxy_account_selected_total` (counter): label `account_id`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Install the process-global Prometheus recorder. Configures
/// `proxy_request_duration_seconds` with explicit buckets so it renders
/// as a histogram (`_bucket` lines) rather than the default summary —
/// the proxy's own request timeout can run well past 60s for long
/// streaming completions, hence the wider upper bound than a typical
/// HTTP service.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("proxy_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub fn record_request(status: u16, route: &str, duration_secs: f64) {
    let status = status.to_string();
    metrics::counter!("proxy_requests_total", "status" => status.clone(), "route" => route.to_string()).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "route" => route.to_string()).record(duration_secs);
}

pub fn record_upstream_error(error_type: &str) {
    metrics::counter!("proxy_upstream_errors_total", "error_type" => error_type.to_string()).increment(1);
}

pub fn record_account_selected(account_id: &str) {
    metrics::counter!("proxy_account_selected_total", "account_id" => account_id.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full("proxy_request_duration_seconds".to_string()),
                DURATION_BUCKETS,
            )
            .expect("failed to set histogram buckets")
            .build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_request_increments_counter_and_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request(200, "/v1/responses", 0.042);
        record_request(502, "/v1/chat/completions", 1.5);

        let output = handle.render();
        assert!(output.contains("proxy_requests_total"));
        assert!(output.contains("status=\"200\""));
        assert!(output.contains("route=\"/v1/responses\""));
        assert!(output.contains("proxy_request_duration_seconds_bucket"));
    }

    #[test]
    fn record_upstream_error_carries_label() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_upstream_error("timeout");
        let output = handle.render();
        assert!(output.contains("error_type=\"timeout\""));
    }

    #[test]
    fn record_account_selected_carries_label() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_account_selected("acc-1");
        let output = handle.render();
        assert!(output.contains("account_id=\"acc-1\""));
    }
}
