//! Metrics sink boundary.
//!
//! Execution code never touches `obs::metrics` directly; every counter
//! update flows through [`MetricsEvent`] and [`MetricsSink`].

use crate::obs::metrics;
use std::{cell::RefCell, sync::Arc, time::Instant};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Arc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Load,
    Count,
    Exists,
    Save,
    Delete,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        entity_path: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        entity_path: &'static str,
        rows_touched: u64,
        elapsed_micros: u64,
    },
    FeedPage {
        entity_path: &'static str,
        items: u64,
    },
    StorageError {
        entity_path: &'static str,
    },
    Unsupported {
        entity_path: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// GlobalMetricsSink
/// Default sink writing into the process-wide counters.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind, entity_path } => metrics::with_state_mut(|m| {
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                let (op, entity) = match kind {
                    ExecKind::Load => (&mut m.ops.load_calls, &mut entry.load_calls),
                    ExecKind::Count => (&mut m.ops.count_calls, &mut entry.count_calls),
                    ExecKind::Exists => (&mut m.ops.exists_calls, &mut entry.exists_calls),
                    ExecKind::Save => (&mut m.ops.save_calls, &mut entry.save_calls),
                    ExecKind::Delete => (&mut m.ops.delete_calls, &mut entry.delete_calls),
                };
                *op = op.saturating_add(1);
                *entity = entity.saturating_add(1);
            }),

            MetricsEvent::ExecFinish {
                kind,
                entity_path,
                rows_touched,
                elapsed_micros,
            } => metrics::with_state_mut(|m| {
                metrics::add_elapsed(
                    &mut m.ops.exec_micros_total,
                    &mut m.ops.exec_micros_max,
                    elapsed_micros,
                );

                let entry = m.entities.entry(entity_path.to_string()).or_default();
                let rows = match kind {
                    ExecKind::Load => Some((&mut m.ops.rows_loaded, &mut entry.rows_loaded)),
                    ExecKind::Save => Some((&mut m.ops.rows_saved, &mut entry.rows_saved)),
                    ExecKind::Delete => Some((&mut m.ops.rows_deleted, &mut entry.rows_deleted)),
                    ExecKind::Count | ExecKind::Exists => None,
                };
                if let Some((op, entity)) = rows {
                    *op = op.saturating_add(rows_touched);
                    *entity = entity.saturating_add(rows_touched);
                }
            }),

            MetricsEvent::FeedPage { entity_path, .. } => metrics::with_state_mut(|m| {
                m.ops.feed_pages = m.ops.feed_pages.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.feed_pages = entry.feed_pages.saturating_add(1);
            }),

            MetricsEvent::StorageError { entity_path } => metrics::with_state_mut(|m| {
                m.ops.storage_errors = m.ops.storage_errors.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.storage_errors = entry.storage_errors.saturating_add(1);
            }),

            MetricsEvent::Unsupported { .. } => metrics::with_state_mut(|m| {
                m.ops.unsupported_rejections = m.ops.unsupported_rejections.saturating_add(1);
            }),
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

/// Route one event to the scoped override, or the global sink.
pub(crate) fn record(event: MetricsEvent) {
    let scoped = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match scoped {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the process-wide counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset the process-wide counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink for the current thread.
pub fn with_metrics_sink<T>(sink: Arc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Arc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// Span
///
/// RAII guard emitting start/finish events for one repository call.
/// Finish accounting happens on drop, including early `?` returns.
///

pub(crate) struct Span {
    kind: ExecKind,
    entity_path: &'static str,
    started: Instant,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: ExecKind, entity_path: &'static str) -> Self {
        record(MetricsEvent::ExecStart { kind, entity_path });

        Self {
            kind,
            entity_path,
            started: Instant::now(),
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }

    pub(crate) const fn add_rows(&mut self, rows: u64) {
        self.rows = self.rows.saturating_add(rows);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        let elapsed_micros = u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX);

        tracing::debug!(
            kind = ?self.kind,
            entity = self.entity_path,
            rows = self.rows,
            elapsed_micros,
            "repository call finished"
        );
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            entity_path: self.entity_path,
            rows_touched: self.rows,
            elapsed_micros,
        });
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[derive(Default)]
    struct CapturingSink {
        events: Mutex<Vec<MetricsEvent>>,
    }

    impl MetricsSink for CapturingSink {
        fn record(&self, event: MetricsEvent) {
            self.events.lock().push(event);
        }
    }

    const PATH: &str = "obs::tests::Entity";

    #[test]
    fn nested_overrides_route_and_restore() {
        let outer = Arc::new(CapturingSink::default());
        let inner = Arc::new(CapturingSink::default());

        with_metrics_sink(outer.clone(), || {
            record(MetricsEvent::FeedPage { entity_path: PATH, items: 1 });
            with_metrics_sink(inner.clone(), || {
                record(MetricsEvent::FeedPage { entity_path: PATH, items: 2 });
            });
            record(MetricsEvent::FeedPage { entity_path: PATH, items: 3 });
        });

        assert_eq!(outer.events.lock().len(), 2);
        assert_eq!(inner.events.lock().len(), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn override_is_restored_on_panic() {
        let sink = Arc::new(CapturingSink::default());

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(sink.clone(), || {
                record(MetricsEvent::Unsupported { entity_path: PATH });
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();

        assert!(panicked);
        assert_eq!(sink.events.lock().len(), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn span_emits_start_then_finish_with_rows() {
        let sink = Arc::new(CapturingSink::default());

        with_metrics_sink(sink.clone(), || {
            let mut span = Span::new(ExecKind::Delete, PATH);
            span.set_rows(2);
            span.add_rows(1);
        });

        let events = sink.events.lock();
        assert_eq!(
            events[0],
            MetricsEvent::ExecStart {
                kind: ExecKind::Delete,
                entity_path: PATH
            }
        );
        assert!(matches!(
            events[1],
            MetricsEvent::ExecFinish {
                kind: ExecKind::Delete,
                rows_touched: 3,
                ..
            }
        ));
    }

    #[test]
    fn global_sink_accumulates_per_entity() {
        let path = "obs::tests::GlobalOnly";
        record(MetricsEvent::ExecStart {
            kind: ExecKind::Load,
            entity_path: path,
        });
        record(MetricsEvent::ExecFinish {
            kind: ExecKind::Load,
            entity_path: path,
            rows_touched: 4,
            elapsed_micros: 10,
        });

        let report = metrics_report();
        let entity = report.entities.get(path).expect("entity counters recorded");
        assert!(entity.load_calls >= 1);
        assert!(entity.rows_loaded >= 4);
    }
}
