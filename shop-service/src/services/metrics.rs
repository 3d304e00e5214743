//! Prometheus metrics for shop-service.

use crate::services::analytics::Period;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Installs the global Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    });
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .and_then(Option::as_ref)
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_ticket_created() {
    metrics::counter!("tickets_created_total").increment(1);
}

/// Label value for a payment method. Stored methods are free text; the label
/// set stays fixed.
pub fn payment_method_label(method: &str) -> &'static str {
    match method.trim().to_ascii_lowercase().as_str() {
        "cash" => "cash",
        "card" => "card",
        "transfer" => "transfer",
        _ => "other",
    }
}

pub fn record_payment(method: &str) {
    metrics::counter!("ticket_payments_total", "method" => payment_method_label(method))
        .increment(1);
}

/// Label value for a requested period. Unknown values report as `all`,
/// matching how the range is resolved.
pub fn period_label(period: &str) -> &'static str {
    Period::from_string(period).unwrap_or(Period::All).as_str()
}

/// Records one analytics report and how many tickets it reduced.
pub fn record_report(period: &str, tickets: usize) {
    metrics::counter!("analytics_reports_total", "period" => period_label(period)).increment(1);
    metrics::histogram!("analytics_tickets_aggregated").record(tickets as f64);
}
