//! Publishes hierarchical, loosely-typed metric records to a Prometheus [push gateway].
//!
//! Metric collection frameworks often describe a metric with a hierarchical namespace, some parts
//! of which are templated per instance, a bag of tags, and a value of whatever type the collector
//! produced. Prometheus instead wants a flat name, a set of labels, and a float. This crate does
//! the translation ("mangling") and pushes the result.
//!
//! # Usage
//!
//! ```no_run
//! # use metrics_exporter_pushgateway::{
//! #     Configuration, NamespaceElement, PublisherBuilder, RawMetric,
//! # };
//! let config = Configuration::new("localhost", 9091);
//! let publisher = PublisherBuilder::new(config).build().expect("failed to build publisher");
//!
//! let metric = RawMetric::new(
//!     vec![
//!         NamespaceElement::new_static("intel"),
//!         NamespaceElement::new_dynamic("cpu_id", "0"),
//!         NamespaceElement::new_static("usage"),
//!     ],
//!     42.5,
//! )
//! .with_unit("%");
//!
//! // Pushes `intel_usage{cpu_id="0",unit="%"} 42.5` as a gauge.
//! let report = publisher.publish_blocking(&[metric]).expect("failed to create runtime");
//! assert_eq!(1, report.pushed());
//! ```
//!
//! The mangling step is available on its own through [`mangle`], and is a pure function.
//!
//! [push gateway]: https://prometheus.io/docs/instrumenting/pushing/
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod config;
pub use self::config::{
    ConfigError, ConfigKind, ConfigPolicy, ConfigRule, ConfigValue, Configuration,
    UNDEFINED_LOG_LEVEL,
};

pub mod formatting;

pub mod logging;

mod mangle;
pub use self::mangle::{
    mangle, UnsupportedValue, HOST_LABEL, RUNNING_ON_TAG, SOURCE_LABEL, UNIT_LABEL,
};

mod metric;
pub use self::metric::{MetricData, NamespaceElement, RawMetric, SanitizedMetric};

#[cfg(feature = "_push-gateway-common")]
mod push;
#[cfg(feature = "_push-gateway-common")]
pub use self::push::PushError;

#[cfg(feature = "_push-gateway-common")]
mod publisher;
#[cfg(feature = "_push-gateway-common")]
#[cfg_attr(docsrs, doc(cfg(feature = "push-gateway")))]
pub use self::publisher::{BuildError, Outcome, PublishReport, PublisherBuilder, PushGatewayPublisher};

#[cfg(feature = "_push-gateway-common")]
mod telemetry;

/// Name the publisher identifies itself with.
pub const PLUGIN_NAME: &str = "prometheus";

/// Version of the publisher's plugin interface.
pub const PLUGIN_VERSION: u64 = 1;

/// Kind of plugin this crate implements.
pub const PLUGIN_TYPE: &str = "publisher";
