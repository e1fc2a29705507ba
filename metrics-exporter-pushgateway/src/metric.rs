//! Metric records on either side of the mangling transform.
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// A single element of a metric's hierarchical namespace.
///
/// Static elements are literal path components. Dynamic elements stand in for a value discovered
/// at collection time, such as a device or instance ID, and carry both the name of the element and
/// the discovered value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceElement {
    /// A literal namespace component.
    Static(String),

    /// A templated namespace component.
    Dynamic {
        /// Declared name of the element, used as the label key once mangled.
        name: String,
        /// Value discovered for this element, used as the label value once mangled.
        value: String,
    },
}

impl NamespaceElement {
    /// Creates a static namespace element.
    pub fn new_static<S: Into<String>>(value: S) -> Self {
        NamespaceElement::Static(value.into())
    }

    /// Creates a dynamic namespace element.
    pub fn new_dynamic<N, V>(name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        NamespaceElement::Dynamic { name: name.into(), value: value.into() }
    }

    /// Whether or not this element is dynamic.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, NamespaceElement::Dynamic { .. })
    }

    /// The value of this element, as it appears in the namespace path.
    pub fn value(&self) -> &str {
        match self {
            NamespaceElement::Static(value) | NamespaceElement::Dynamic { value, .. } => value,
        }
    }
}

/// The value of a raw metric.
///
/// Collectors may report a value of any type, so this mirrors the shapes that commonly come out of
/// a loosely-typed collection framework. Only values whose [`Display`](fmt::Display) rendering is a
/// valid floating-point literal can be published.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricData {
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    Uint(u64),
    /// A single-precision float.
    Float32(f32),
    /// A double-precision float.
    Float(f64),
    /// A string, which may or may not hold a number.
    String(String),
    /// A sequence of values.
    List(Vec<MetricData>),
    /// A map of values.
    Map(BTreeMap<String, MetricData>),
    /// No value.
    Null,
}

impl fmt::Display for MetricData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricData::Bool(b) => write!(f, "{b}"),
            MetricData::Int(i) => write!(f, "{i}"),
            MetricData::Uint(u) => write!(f, "{u}"),
            MetricData::Float32(v) => write!(f, "{v}"),
            MetricData::Float(v) => write!(f, "{v}"),
            MetricData::String(s) => f.write_str(s),
            MetricData::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i != 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            MetricData::Map(entries) => {
                f.write_str("map[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i != 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("]")
            }
            MetricData::Null => f.write_str("<nil>"),
        }
    }
}

macro_rules! impl_from_data {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for MetricData {
                fn from(value: $ty) -> Self {
                    MetricData::$variant(value.into())
                }
            }
        )+
    };
}

impl_from_data!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    f32 => Float32,
    f64 => Float,
    String => String,
    &str => String,
);

/// A metric as reported by a collector.
#[derive(Clone, Debug, PartialEq)]
pub struct RawMetric {
    namespace: Vec<NamespaceElement>,
    tags: BTreeMap<String, String>,
    data: MetricData,
    unit: String,
    timestamp: SystemTime,
}

impl RawMetric {
    /// Creates a new [`RawMetric`] with the given namespace and value.
    ///
    /// The metric starts out with no tags, an empty unit, and a timestamp of "now".
    pub fn new<N, D>(namespace: N, data: D) -> Self
    where
        N: IntoIterator<Item = NamespaceElement>,
        D: Into<MetricData>,
    {
        Self {
            namespace: namespace.into_iter().collect(),
            tags: BTreeMap::new(),
            data: data.into(),
            unit: String::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Adds a tag to this metric, replacing any existing tag with the same key.
    #[must_use]
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Sets the unit of this metric.
    #[must_use]
    pub fn with_unit<U: Into<String>>(mut self, unit: U) -> Self {
        self.unit = unit.into();
        self
    }

    /// Sets the collection timestamp of this metric.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Namespace of this metric.
    pub fn namespace(&self) -> &[NamespaceElement] {
        &self.namespace
    }

    /// Positions of the dynamic elements, as indices into the namespace.
    pub fn dynamic_indices(&self) -> Vec<usize> {
        self.namespace
            .iter()
            .enumerate()
            .filter(|(_, element)| element.is_dynamic())
            .map(|(i, _)| i)
            .collect()
    }

    /// Tags of this metric, ordered by key.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Value of this metric.
    pub fn data(&self) -> &MetricData {
        &self.data
    }

    /// Unit of this metric.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Collection timestamp of this metric.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

/// A metric in the Prometheus data model: a flat name, a set of labels, and a numeric value.
#[derive(Clone, Debug, PartialEq)]
pub struct SanitizedMetric {
    /// Flat metric name.
    pub name: String,
    /// Labels, ordered by key.
    pub labels: BTreeMap<String, String>,
    /// Value.
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{MetricData, NamespaceElement, RawMetric};

    #[test]
    fn test_metric_data_display() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), MetricData::Int(2));
        map.insert("a".to_string(), MetricData::Bool(false));

        let cases = vec![
            (MetricData::Bool(true), "true"),
            (MetricData::Int(-42), "-42"),
            (MetricData::Uint(42), "42"),
            (MetricData::Float32(1.5), "1.5"),
            (MetricData::Float(2.75), "2.75"),
            (MetricData::Float(42.0), "42"),
            (MetricData::String("hello world".to_string()), "hello world"),
            (MetricData::List(vec![MetricData::Int(1), MetricData::Float(2.5)]), "[1 2.5]"),
            (MetricData::Map(map), "map[a:false b:2]"),
            (MetricData::Null, "<nil>"),
        ];

        for (input, expected) in cases {
            assert_eq!(expected, input.to_string());
        }
    }

    #[test]
    fn test_metric_data_from_primitives() {
        assert_eq!(MetricData::Int(7), MetricData::from(7i32));
        assert_eq!(MetricData::Uint(7), MetricData::from(7u8));
        assert_eq!(MetricData::Float(0.25), MetricData::from(0.25f64));
        assert_eq!(MetricData::String("x".to_string()), MetricData::from("x"));
        assert_eq!(MetricData::Bool(true), MetricData::from(true));
    }

    #[test]
    fn test_dynamic_indices() {
        let metric = RawMetric::new(
            vec![
                NamespaceElement::new_static("intel"),
                NamespaceElement::new_dynamic("cpu_id", "0"),
                NamespaceElement::new_static("usage"),
                NamespaceElement::new_dynamic("core", "3"),
            ],
            1,
        );

        assert_eq!(vec![1, 3], metric.dynamic_indices());
        assert_eq!("0", metric.namespace()[1].value());
        assert!(!metric.namespace()[0].is_dynamic());
    }

    #[test]
    fn test_tags_replace_existing_key() {
        let metric = RawMetric::new(vec![NamespaceElement::new_static("a")], 1)
            .with_tag("zone", "us-east")
            .with_tag("zone", "eu-west")
            .with_unit("B");

        assert_eq!(1, metric.tags().len());
        assert_eq!(Some("eu-west"), metric.tags().get("zone").map(String::as_str));
        assert_eq!("B", metric.unit());
    }
}
