//! Metrics sink boundary.
//!
//! This module is the only bridge between execution logic and the
//! thread-local metrics state.

use crate::obs::metrics::{self, EventReport};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// OperatorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperatorKind {
    Selection,
    SelectionOrderBy,
    Aggregation,
    GroupBy,
    Distinct,
}

impl OperatorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::SelectionOrderBy => "selection_order_by",
            Self::Aggregation => "aggregation",
            Self::GroupBy => "group_by",
            Self::Distinct => "distinct",
        }
    }
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    OperatorStart {
        kind: OperatorKind,
    },
    BlocksScanned {
        kind: OperatorKind,
        blocks: u64,
        docs: u64,
    },
    GroupResize {
        new_capacity: u64,
    },
    MergeFinish {
        partials: u64,
        exceptions: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::OperatorStart { kind } => {
                metrics::with_state_mut(|m| {
                    m.ops.operator_calls = m.ops.operator_calls.saturating_add(1);
                    let entry = m.operators.entry(kind.as_str().to_string()).or_default();
                    entry.calls = entry.calls.saturating_add(1);
                });
            }

            MetricsEvent::BlocksScanned { kind, blocks, docs } => {
                metrics::with_state_mut(|m| {
                    m.ops.blocks_scanned = m.ops.blocks_scanned.saturating_add(blocks);
                    m.ops.docs_scanned = m.ops.docs_scanned.saturating_add(docs);
                    let entry = m.operators.entry(kind.as_str().to_string()).or_default();
                    entry.blocks_scanned = entry.blocks_scanned.saturating_add(blocks);
                    entry.docs_scanned = entry.docs_scanned.saturating_add(docs);
                });
            }

            MetricsEvent::GroupResize { new_capacity } => {
                metrics::with_state_mut(|m| {
                    m.ops.group_resizes = m.ops.group_resizes.saturating_add(1);
                    m.ops.max_group_capacity = m.ops.max_group_capacity.max(new_capacity);
                });
            }

            MetricsEvent::MergeFinish {
                partials,
                exceptions,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.merges = m.ops.merges.saturating_add(1);
                    m.ops.partials_merged = m.ops.partials_merged.saturating_add(partials);
                    m.ops.processing_exceptions =
                        m.ops.processing_exceptions.saturating_add(exceptions);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match override_sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start and scan-volume events for one operator run.
/// Scan volume is reported even on early return.

pub(crate) struct Span {
    kind: OperatorKind,
    blocks: u64,
    docs: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: OperatorKind) -> Self {
        record(MetricsEvent::OperatorStart { kind });

        Self {
            kind,
            blocks: 0,
            docs: 0,
        }
    }

    pub(crate) const fn add_block(&mut self, docs: usize) {
        self.blocks = self.blocks.saturating_add(1);
        self.docs = self.docs.saturating_add(docs as u64);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::BlocksScanned {
            kind: self.kind,
            blocks: self.blocks,
            docs: self.docs,
        });
    }
}
