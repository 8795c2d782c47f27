use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// Records one persisted attempt; `store` is `main`, `mock` or `legacy`.
pub(crate) fn record_attempt(store: &'static str, total_marks: f64) {
    metrics::counter!("attempts_submitted_total", "store" => store).increment(1);
    metrics::histogram!("attempt_total_marks", "store" => store).record(total_marks);
}

pub(crate) fn record_rejected_submission(reason: &'static str) {
    metrics::counter!("attempts_rejected_total", "reason" => reason).increment(1);
}
