use metrics::{counter, Counter};

use crate::publisher::Outcome;

const METRICS_TOTAL: &str = "pushgateway_publisher_metrics_total";

/// Publisher telemetry.
///
/// Counts the outcome of every metric handled by a publisher, through whichever `metrics` recorder
/// is installed when the publisher is built. Without a recorder, the counters are no-ops.
pub(crate) struct Telemetry {
    pushed: Counter,
    skipped: Counter,
    failed: Counter,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            pushed: counter!(METRICS_TOTAL, "result" => "pushed"),
            skipped: counter!(METRICS_TOTAL, "result" => "skipped"),
            failed: counter!(METRICS_TOTAL, "result" => "failed"),
        }
    }

    pub fn record(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Pushed(_) => self.pushed.increment(1),
            Outcome::Skipped(_) => self.skipped.increment(1),
            Outcome::Failed { .. } => self.failed.increment(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use metrics::{Key, Label};
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use metrics_util::{CompositeKey, MetricKind};

    use super::{Telemetry, METRICS_TOTAL};
    use crate::mangle::UnsupportedValue;
    use crate::metric::{MetricData, SanitizedMetric};
    use crate::publisher::Outcome;

    #[test]
    fn test_record_outcomes() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let telemetry = metrics::with_local_recorder(&recorder, Telemetry::new);

        let metric = SanitizedMetric { name: "up".to_string(), labels: BTreeMap::new(), value: 1.0 };
        telemetry.record(&Outcome::Pushed(metric.clone()));
        telemetry.record(&Outcome::Pushed(metric));
        telemetry.record(&Outcome::Skipped(UnsupportedValue {
            name: "up".to_string(),
            value: MetricData::Bool(true),
        }));

        let snapshot = snapshotter.snapshot().into_hashmap();
        let count = |result: &'static str| {
            let key = Key::from_parts(METRICS_TOTAL, vec![Label::new("result", result)]);
            match snapshot.get(&CompositeKey::new(MetricKind::Counter, key)) {
                Some((_, _, DebugValue::Counter(value))) => *value,
                other => panic!("unexpected value for result={result}: {other:?}"),
            }
        };

        assert_eq!(2, count("pushed"));
        assert_eq!(1, count("skipped"));
        assert_eq!(0, count("failed"));
    }
}
