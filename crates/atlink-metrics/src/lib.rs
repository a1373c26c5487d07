//! Metrics for the atlink session.
//!
//! Every metric recorded by the session and runner is declared here as a
//! [`Metric`] constant so names stay consistent. The `metrics` crate is
//! re-exported; installing a recorder is up to the binary.
//!
//! ```rust
//! use atlink_metrics::{metric_defs, metrics};
//!
//! metrics::counter!(metric_defs::COMMANDS_SENT.name).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic count.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Distribution of recorded values.
    Histogram,
}

/// A metric declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "atlink.command.sent").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Metric {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a counter with no description, unit or labels.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Set the human-readable description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the unit of measurement.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Command Cycle
    // ========================================================================

    /// Commands written to the transport.
    pub const COMMANDS_SENT: Metric = Metric::counter("atlink.command.sent")
        .with_description("Commands written to the transport")
        .with_unit(Unit::Count)
        .with_labels(&["intention"]);

    /// Commands refused before reaching the queue.
    pub const COMMANDS_REJECTED: Metric = Metric::counter("atlink.command.rejected")
        .with_description("Commands rejected at enqueue (blank, too long, multi-line)")
        .with_unit(Unit::Count);

    /// Commands waiting in the outgoing queue.
    pub const QUEUE_DEPTH: Metric = Metric::gauge("atlink.command.queue_depth")
        .with_description("Commands waiting in the outgoing queue")
        .with_unit(Unit::Count);

    /// Full responses received.
    pub const RESPONSES_RECEIVED: Metric = Metric::counter("atlink.response.received")
        .with_description("Full responses received")
        .with_unit(Unit::Count)
        .with_labels(&["delimiter"]);

    /// Time from command write to full response.
    pub const RESPONSE_LATENCY: Metric = Metric::histogram("atlink.response.latency_ms")
        .with_description("Time from command write to full response")
        .with_unit(Unit::Milliseconds);

    // ========================================================================
    // Session
    // ========================================================================

    /// State transitions, by the state entered.
    pub const STATE_TRANSITIONS: Metric = Metric::counter("atlink.session.transitions")
        .with_description("State transitions by state entered")
        .with_unit(Unit::Count)
        .with_labels(&["state"]);

    /// Waits that ran past the response timeout.
    pub const TIMEOUTS: Metric = Metric::counter("atlink.session.timeouts")
        .with_description("Waits that exceeded the response timeout")
        .with_unit(Unit::Count);

    /// Keepalive probes sent.
    pub const PINGS_SENT: Metric = Metric::counter("atlink.session.pings")
        .with_description("Keepalive probes sent while idle")
        .with_unit(Unit::Count);

    // ========================================================================
    // Transport
    // ========================================================================

    /// Failed attempts to open the link.
    pub const OPEN_FAILURES: Metric = Metric::counter("atlink.transport.open_failures")
        .with_description("Failed attempts to open the link")
        .with_unit(Unit::Count);

    /// Writes the transport reported as failed.
    pub const WRITE_FAILURES: Metric = Metric::counter("atlink.transport.write_failures")
        .with_description("Writes the transport reported as failed")
        .with_unit(Unit::Count);

    /// Bytes received from the link.
    pub const BYTES_RECEIVED: Metric = Metric::counter("atlink.transport.rx_bytes")
        .with_description("Bytes received from the link")
        .with_unit(Unit::Bytes);

    /// All metrics, for bulk registration.
    pub const ALL: &[Metric] = &[
        COMMANDS_SENT,
        COMMANDS_REJECTED,
        QUEUE_DEPTH,
        RESPONSES_RECEIVED,
        RESPONSE_LATENCY,
        STATE_TRANSITIONS,
        TIMEOUTS,
        PINGS_SENT,
        OPEN_FAILURES,
        WRITE_FAILURES,
        BYTES_RECEIVED,
    ];
}

/// Register descriptions for every metric. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
