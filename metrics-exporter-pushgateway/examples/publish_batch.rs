/// Pushes a small batch of metrics to a push gateway listening on `127.0.0.1:9091`.
///
/// Start one with `docker run -p 9091:9091 prom/pushgateway`, then look at
/// `http://127.0.0.1:9091` after running this example.
use std::collections::HashMap;

use metrics_exporter_pushgateway::{
    ConfigValue, Configuration, MetricData, NamespaceElement, Outcome, PublisherBuilder,
    RawMetric, RUNNING_ON_TAG,
};

fn main() {
    let mut settings = HashMap::new();
    settings.insert("host".to_string(), ConfigValue::from("127.0.0.1"));
    settings.insert("port".to_string(), ConfigValue::Int(9091));
    settings.insert("debug".to_string(), ConfigValue::Bool(true));

    let config = Configuration::from_map(&settings).expect("invalid configuration");
    let publisher = PublisherBuilder::new(config).build().expect("failed to build publisher");

    let metrics = vec![
        RawMetric::new(
            vec![
                NamespaceElement::new_static("intel"),
                NamespaceElement::new_static("procfs"),
                NamespaceElement::new_dynamic("cpu_id", "0"),
                NamespaceElement::new_static("user_percentage"),
            ],
            12.5,
        )
        .with_unit("%")
        .with_tag(RUNNING_ON_TAG, "node-1"),
        RawMetric::new(
            vec![
                NamespaceElement::new_static("intel"),
                NamespaceElement::new_static("procfs"),
                NamespaceElement::new_static("meminfo"),
                NamespaceElement::new_static("mem_free"),
            ],
            "8167612",
        )
        .with_unit("B")
        .with_tag(RUNNING_ON_TAG, "node-1"),
        // Not a number, so this one is logged and skipped.
        RawMetric::new(
            vec![NamespaceElement::new_static("intel"), NamespaceElement::new_static("up")],
            MetricData::Bool(true),
        ),
    ];

    let report = publisher.publish_blocking(&metrics).expect("failed to create runtime");
    for outcome in report.outcomes() {
        match outcome {
            Outcome::Pushed(metric) => println!("pushed {} = {}", metric.name, metric.value),
            Outcome::Skipped(e) => println!("skipped: {e}"),
            Outcome::Failed { metric, error } => println!("failed {}: {error}", metric.name),
        }
    }
}
