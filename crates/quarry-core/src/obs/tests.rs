use super::{
    MetricsEvent, MetricsSink, OperatorKind, metrics_report, metrics_reset_all,
    sink::{Span, record},
    with_metrics_sink,
};
use std::{cell::RefCell, rc::Rc};

#[derive(Default)]
struct CapturingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for CapturingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[test]
fn span_reports_scan_volume_on_drop() {
    let sink = Rc::new(CapturingSink::default());

    with_metrics_sink(sink.clone(), || {
        let mut span = Span::new(OperatorKind::Distinct);
        span.add_block(10);
        span.add_block(5);
    });

    assert_eq!(
        *sink.events.borrow(),
        vec![
            MetricsEvent::OperatorStart {
                kind: OperatorKind::Distinct
            },
            MetricsEvent::BlocksScanned {
                kind: OperatorKind::Distinct,
                blocks: 2,
                docs: 15,
            },
        ]
    );
}

#[test]
fn override_sink_is_restored_after_the_closure() {
    metrics_reset_all();
    let sink = Rc::new(CapturingSink::default());

    with_metrics_sink(sink.clone(), || {
        record(MetricsEvent::GroupResize { new_capacity: 8 });
    });
    record(MetricsEvent::GroupResize { new_capacity: 32 });

    assert_eq!(sink.events.borrow().len(), 1);
    let report = metrics_report();
    assert_eq!(report.ops.group_resizes, 1);
    assert_eq!(report.ops.max_group_capacity, 32);
}

#[test]
fn global_sink_tracks_per_operator_counters() {
    metrics_reset_all();

    {
        let mut span = Span::new(OperatorKind::Selection);
        span.add_block(100);
    }
    record(MetricsEvent::MergeFinish {
        partials: 3,
        exceptions: 1,
    });

    let report = metrics_report();
    let selection = report
        .operators
        .get("selection")
        .expect("selection counters should exist");
    assert_eq!(selection.calls, 1);
    assert_eq!(selection.docs_scanned, 100);
    assert_eq!(report.ops.partials_merged, 3);
    assert_eq!(report.ops.processing_exceptions, 1);
}
