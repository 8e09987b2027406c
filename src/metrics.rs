use axum_prometheus::metrics::Counter;

pub const VISITS_TOTAL: &str = "website_visits_total";

/// Counts committed visit rows written by this process.
pub fn visits_recorded() -> Counter {
    axum_prometheus::metrics::counter!(VISITS_TOTAL)
}
