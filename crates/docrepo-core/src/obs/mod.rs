//! Observability: execution counters and the sink boundary.
//!
//! Repository and executor code emit [`MetricsEvent`]s through
//! `sink::record` and `tracing` events; nothing else touches the counters.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EventOps, EventReport};
pub use sink::{
    ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};
