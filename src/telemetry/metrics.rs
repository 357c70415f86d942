//! Prometheus metrics setup and metric definitions

use anyhow::Context;
use metrics::{counter, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    let buckets = vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so the scrape
/// output lists every metric from startup.
pub fn describe_metrics() {
    describe_counter!(
        "leadflow_assignments_total",
        "Leads assigned to a team member by a rule"
    );
    describe_counter!(
        "leadflow_unassigned_total",
        "Leads evaluated without any matching rule"
    );
    describe_counter!(
        "leadflow_duplicate_groups_total",
        "Duplicate groups emitted by scans"
    );
    describe_counter!("leadflow_merges_total", "Duplicate groups merged");
    describe_counter!(
        "leadflow_cycle_errors_total",
        "Per-item errors reported by routing cycles"
    );
    describe_histogram!(
        "leadflow_cycle_duration_seconds",
        "Routing cycle duration in seconds"
    );

    counter!("leadflow_assignments_total").absolute(0);
    counter!("leadflow_unassigned_total").absolute(0);
    counter!("leadflow_duplicate_groups_total").absolute(0);
    counter!("leadflow_merges_total").absolute(0);
    counter!("leadflow_cycle_errors_total").absolute(0);
}
