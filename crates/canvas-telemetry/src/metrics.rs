//! Prometheus metrics for the canvas subsystems.
//!
//! All metrics follow the naming convention: `pc_<subsystem>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CANVAS STORE METRICS
    // =========================================================================

    /// Write attempts by outcome
    pub static ref WRITES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("pc_canvas_writes_total", "Write attempts through the admission gate"),
        &["outcome"]  // outcome: accepted/denied/out_of_bounds/replayed/failed
    ).expect("metric creation failed");

    /// Latest committed revision
    pub static ref CANVAS_REVISION: Gauge = Gauge::new(
        "pc_canvas_revision",
        "Latest committed canvas revision"
    ).expect("metric creation failed");

    // =========================================================================
    // CREDIT LEDGER METRICS
    // =========================================================================

    /// Credit attempts by outcome
    pub static ref CREDITS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("pc_ledger_credits_total", "Credit attempts by outcome"),
        &["outcome"]  // outcome: applied/duplicate
    ).expect("metric creation failed");

    /// Units granted by confirmed payments
    pub static ref CREDITED_UNITS: Counter = Counter::new(
        "pc_ledger_credited_units_total",
        "Write units granted by confirmed payments"
    ).expect("metric creation failed");

    // =========================================================================
    // PAYMENT VERIFICATION METRICS
    // =========================================================================

    /// Payments reaching a terminal state
    pub static ref PAYMENTS_SETTLED: CounterVec = CounterVec::new(
        Opts::new("pc_payments_settled_total", "Payments by terminal state"),
        &["state"]  // state: confirmed/timed_out/failed
    ).expect("metric creation failed");

    /// Verification machines currently polling
    pub static ref PAYMENTS_IN_FLIGHT: Gauge = Gauge::new(
        "pc_payments_in_flight",
        "Verification machines currently polling"
    ).expect("metric creation failed");

    /// Submitted-to-confirmed wall clock
    pub static ref CONFIRMATION_SECONDS: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "pc_payments_confirmation_seconds",
            "Time from submission to confirmation"
        ).buckets(exponential_buckets(0.25, 2.0, 10).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Failed oracle queries (retried)
    pub static ref ORACLE_ERRORS: Counter = Counter::new(
        "pc_payments_oracle_errors_total",
        "Finality oracle queries that failed and were retried"
    ).expect("metric creation failed");

    // =========================================================================
    // BROADCAST METRICS
    // =========================================================================

    /// Connected stream subscribers
    pub static ref BROADCAST_SUBSCRIBERS: Gauge = Gauge::new(
        "pc_broadcast_subscribers",
        "Connected broadcast stream subscribers"
    ).expect("metric creation failed");

    /// Lagging subscribers resynchronized from a snapshot
    pub static ref BROADCAST_RESYNCS: Counter = Counter::new(
        "pc_broadcast_resyncs_total",
        "Lagging subscribers resynchronized with a snapshot"
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Subsystem errors by type
    pub static ref SUBSYSTEM_ERRORS: CounterVec = CounterVec::new(
        Opts::new("pc_subsystem_errors_total", "Errors by subsystem and type"),
        &["subsystem", "error_type"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; already registered collectors are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Canvas
        Box::new(WRITES_TOTAL.clone()),
        Box::new(CANVAS_REVISION.clone()),
        // Ledger
        Box::new(CREDITS_TOTAL.clone()),
        Box::new(CREDITED_UNITS.clone()),
        // Payments
        Box::new(PAYMENTS_SETTLED.clone()),
        Box::new(PAYMENTS_IN_FLIGHT.clone()),
        Box::new(CONFIRMATION_SECONDS.clone()),
        Box::new(ORACLE_ERRORS.clone()),
        // Broadcast
        Box::new(BROADCAST_SUBSCRIBERS.clone()),
        Box::new(BROADCAST_RESYNCS.clone()),
        // Errors
        Box::new(SUBSYSTEM_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
