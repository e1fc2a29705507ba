//! Mangling of raw metrics into the Prometheus data model.
//!
//! A raw metric has a hierarchical namespace, some of which may be dynamic, a set of tags, and a
//! value of any type. Prometheus wants a flat name, a label set, and a float. [`mangle`] bridges
//! the two:
//!
//! - dynamic namespace elements become labels and are dropped from the name
//! - the remaining namespace elements are sanitized and joined with `_`
//! - the unit becomes a `unit` label, unless the metric already carries a `unit` tag
//! - tags become labels, with the running-on-host marker expanded into `source` and `host`
//! - the value is coerced to a float via its string form
use std::collections::BTreeMap;

use thiserror::Error;

use crate::formatting::{sanitize_label_key, sanitize_metric_name};
use crate::metric::{MetricData, NamespaceElement, RawMetric, SanitizedMetric};

/// Tag key set by the collection framework to the host that the collecting plugin runs on.
pub const RUNNING_ON_TAG: &str = "plugin_running_on";

/// Label carrying the origin of a metric.
pub const SOURCE_LABEL: &str = "source";

/// Label carrying the host a metric was collected on.
pub const HOST_LABEL: &str = "host";

/// Label carrying the unit of a metric.
pub const UNIT_LABEL: &str = "unit";

/// The value of a metric could not be coerced to a float.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("unsupported metric data for prometheus {name}: {value:?}")]
pub struct UnsupportedValue {
    /// Flat name of the metric the value belongs to.
    pub name: String,
    /// The original value.
    pub value: MetricData,
}

/// Mangles a raw metric into a flat name, a label set, and a float value.
///
/// Tags are processed in key order, so when two tag keys sanitize to the same label key, the tag
/// whose original key sorts last wins.
///
/// # Errors
///
/// If the value of the metric does not render to a valid floating-point literal, an
/// [`UnsupportedValue`] error is returned and no output is produced.
pub fn mangle(metric: &RawMetric) -> Result<SanitizedMetric, UnsupportedValue> {
    let (segments, mut labels) = split_namespace(metric.namespace(), &metric.dynamic_indices());

    let name = segments.iter().map(|s| sanitize_metric_name(s)).collect::<Vec<_>>().join("_");

    let tags = metric.tags();
    if !tags.contains_key(UNIT_LABEL) {
        labels.insert(UNIT_LABEL.to_string(), metric.unit().to_string());
    }

    for (key, value) in tags {
        if key == RUNNING_ON_TAG {
            if !tags.contains_key(SOURCE_LABEL) {
                labels.insert(SOURCE_LABEL.to_string(), value.clone());
            }
            if !tags.contains_key(HOST_LABEL) {
                labels.insert(HOST_LABEL.to_string(), value.clone());
            }
        } else {
            labels.insert(sanitize_label_key(key), value.clone());
        }
    }

    let value = coerce_value(metric.data())
        .ok_or_else(|| UnsupportedValue { name: name.clone(), value: metric.data().clone() })?;

    Ok(SanitizedMetric { name, labels, value })
}

/// Splits a namespace into its static segments and the labels derived from its dynamic elements.
///
/// `dynamic` holds the positions of the dynamic elements in the unmodified namespace, in
/// ascending order. Removing the `i`-th of them shifts everything after it left by `i`, so the
/// element at original index `j` is found at `j - i` in the shrinking namespace. A single pass
/// that counts removals reaches the same result without mutating anything.
fn split_namespace(
    namespace: &[NamespaceElement],
    dynamic: &[usize],
) -> (Vec<String>, BTreeMap<String, String>) {
    let mut segments = Vec::with_capacity(namespace.len().saturating_sub(dynamic.len()));
    let mut labels = BTreeMap::new();
    let mut removed = 0;

    for (position, element) in namespace.iter().enumerate() {
        if dynamic.get(removed) == Some(&position) {
            if let NamespaceElement::Dynamic { name, value } = element {
                labels.insert(name.clone(), value.clone());
            }
            removed += 1;
            continue;
        }

        segments.push(element.value().to_string());
    }

    (segments, labels)
}

fn coerce_value(data: &MetricData) -> Option<f64> {
    data.to_string().parse::<f64>().ok()
}
