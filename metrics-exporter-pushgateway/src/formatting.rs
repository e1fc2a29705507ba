//! Helpers for sanitizing names and rendering metrics in the Prometheus exposition format.

use crate::metric::SanitizedMetric;

/// Sanitizes a metric name, or a single namespace component of one.
///
/// Every character outside of `[a-zA-Z0-9:_]` is replaced with an underscore. Unlike the full
/// Prometheus [data model] rules, a leading digit is left as-is: namespace components are sanitized
/// individually and joined afterwards, so only the character class is enforced here.
///
/// [data model]: https://prometheus.io/docs/concepts/data_model/#metric-names-and-labels
pub fn sanitize_metric_name(name: &str) -> String {
    name.chars().map(|c| if valid_metric_name_character(c) { c } else { '_' }).collect()
}

/// Sanitizes a label key.
///
/// Every character outside of `[a-zA-Z0-9_]` is replaced with an underscore.
pub fn sanitize_label_key(key: &str) -> String {
    key.chars().map(|c| if valid_label_key_character(c) { c } else { '_' }).collect()
}

/// Sanitizes a metric description to be valid under the Prometheus [exposition format].
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn sanitize_description(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Formats a sample value the way Prometheus expects it.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::from("NaN")
    } else if value == f64::INFINITY {
        String::from("+Inf")
    } else if value == f64::NEG_INFINITY {
        String::from("-Inf")
    } else {
        value.to_string()
    }
}

/// Writes a help (description) line.
pub fn write_help_line(buffer: &mut String, name: &str, desc: &str) {
    buffer.push_str("# HELP ");
    buffer.push_str(name);
    buffer.push(' ');
    buffer.push_str(&sanitize_description(desc));
    buffer.push('\n');
}

/// Writes a metric type line.
pub fn write_type_line(buffer: &mut String, name: &str, metric_type: &str) {
    buffer.push_str("# TYPE ");
    buffer.push_str(name);
    buffer.push(' ');
    buffer.push_str(metric_type);
    buffer.push('\n');
}

/// Writes a single, unlabeled sample line.
pub fn write_metric_line(buffer: &mut String, name: &str, value: f64) {
    buffer.push_str(name);
    buffer.push(' ');
    buffer.push_str(&format_value(value));
    buffer.push('\n');
}

/// Renders a sanitized metric as a single gauge, ready to be pushed.
///
/// The labels are left out of the sample line: when pushing, they form the grouping key in the
/// request path, and the push gateway attaches them to every sample in the group.
pub fn render_gauge(metric: &SanitizedMetric) -> String {
    let mut buffer = String::new();
    write_help_line(&mut buffer, &metric.name, &format!("Collected metric {}", metric.name));
    write_type_line(&mut buffer, &metric.name, "gauge");
    write_metric_line(&mut buffer, &metric.name, metric.value);
    buffer
}

#[inline]
pub(crate) fn valid_metric_name_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z0-9_:].
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

#[inline]
pub(crate) fn valid_label_key_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z0-9_].
    c.is_ascii_alphanumeric() || c == '_'
}
