//! Prometheus metrics exposition
//!
//! The pool core emits its own counters (`pool_selections_total`,
//! `pool_exhausted_total`, `pool_record_errors_total`, `pool_flushes_total`,
//! `probe_duration_seconds`); this module installs the recorder they all
//! land in and adds the request-level series:
//!
//! - `gateway_requests_total` (counter): labels `provider_type`, `status`
//! - `gateway_request_duration_seconds` (histogram): label `provider_type`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Both duration histograms get explicit buckets so they render with
/// `_bucket` lines for `histogram_quantile()` queries instead of the
/// default summary form.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("gateway_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
        .set_buckets_for_metric(
            Matcher::Full("probe_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed generate request.
pub fn record_request(provider_type: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "gateway_requests_total",
        "provider_type" => provider_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "provider_type" => provider_type.to_string()
    )
    .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // When no recorder is installed, metrics calls are no-ops.
        record_request("openai", 200, 0.05);
    }

    /// Create an isolated recorder/handle pair for unit tests.
    /// install_recorder() panics on a second call in the same process.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("gateway_request_duration_seconds".to_string()),
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

        record_request("openai", 200, 0.042);
        record_request("gemini", 502, 1.5);

        let output = handle.render();
        assert!(output.contains("gateway_requests_total"));
        assert!(output.contains("provider_type=\"openai\""));
        assert!(output.contains("status=\"200\""));
        assert!(output.contains("provider_type=\"gemini\""));
        assert!(output.contains("status=\"502\""));
        assert!(
            output.contains("gateway_request_duration_seconds_bucket"),
            "histogram must render _bucket lines"
        );
    }

    #[test]
    fn pool_counters_flow_through_the_same_recorder() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        metrics::counter!("pool_selections_total", "provider_type" => "openai".to_string())
            .increment(1);

        let output = handle.render();
        assert!(output.contains("pool_selections_total"));
    }
}
