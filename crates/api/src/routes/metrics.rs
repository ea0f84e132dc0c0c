//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers descriptions for the shop's metrics so they show up with
/// `# HELP` lines before their first sample.
pub fn describe() {
    metrics::describe_counter!("orders_placed_total", "Orders written by checkout");
    metrics::describe_counter!(
        "checkout_cart_clear_failures_total",
        "Checkouts whose order was written but whose cart could not be cleared"
    );
    metrics::describe_counter!("cart_mutations_total", "Cart writes by operation");
    metrics::describe_counter!(
        "notifications_failed_total",
        "Emails that could not be delivered"
    );
    metrics::describe_counter!("invoices_rendered_total", "Invoice render passes");
    metrics::describe_counter!(
        "invoice_sink_failures_total",
        "Invoice sinks (file or response) that failed mid-render"
    );
    metrics::describe_histogram!(
        "checkout_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent in checkout"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.run_upkeep();
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
