use std::io;
use std::time::Duration;

use http_body_util::{BodyExt, Collected, Full};
use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::Uri;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use thiserror::Error;
use tracing::instrument::WithSubscriber as _;
use tracing::{debug, error, Dispatch, Instrument as _};

use crate::config::{ConfigError, Configuration};
use crate::formatting::render_gauge;
use crate::logging;
use crate::mangle::{mangle, UnsupportedValue};
use crate::metric::{RawMetric, SanitizedMetric};
use crate::push::{self, PushError};
use crate::telemetry::Telemetry;

/// Errors that could occur while building a publisher.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The configuration does not describe a usable push gateway.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// The platform's root certificates could not be loaded.
    #[error("no native root CA certificates found: {0}")]
    NativeRoots(#[from] io::Error),

    /// The basic authentication credentials cannot be sent as a header.
    #[error("invalid basic authentication credentials: {0}")]
    InvalidCredentials(String),
}

/// What happened to a single metric of a batch.
#[derive(Debug)]
pub enum Outcome {
    /// The metric was mangled and pushed.
    Pushed(SanitizedMetric),

    /// The metric value could not be converted, so the metric was not pushed.
    Skipped(UnsupportedValue),

    /// The metric was mangled, but pushing it failed.
    Failed {
        /// The mangled metric.
        metric: SanitizedMetric,
        /// Why the push failed.
        error: PushError,
    },
}

impl Outcome {
    /// Whether or not the metric reached the push gateway.
    pub fn is_pushed(&self) -> bool {
        matches!(self, Outcome::Pushed(_))
    }
}

/// The outcome of publishing a batch of metrics.
#[derive(Debug, Default)]
pub struct PublishReport {
    outcomes: Vec<Outcome>,
}

impl PublishReport {
    /// Outcome of every metric, in the order the metrics were given.
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Consumes the report, returning the outcome of every metric.
    pub fn into_outcomes(self) -> Vec<Outcome> {
        self.outcomes
    }

    /// Number of metrics pushed.
    pub fn pushed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, Outcome::Pushed(_))).count()
    }

    /// Number of metrics skipped due to an unsupported value.
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, Outcome::Skipped(_))).count()
    }

    /// Number of metrics whose push failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, Outcome::Failed { .. })).count()
    }
}

/// Builder for a [`PushGatewayPublisher`].
pub struct PublisherBuilder {
    config: Configuration,
    dispatch: Option<Dispatch>,
}

impl PublisherBuilder {
    /// Creates a new [`PublisherBuilder`] for the given configuration.
    pub fn new(config: Configuration) -> Self {
        Self { config, dispatch: None }
    }

    /// Sets the dispatcher the publisher logs through.
    ///
    /// Defaults to a formatting subscriber at the configured log level. See [`logging::dispatch`].
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Builds the publisher.
    ///
    /// No connections are made until a batch is published.
    ///
    /// # Errors
    ///
    /// If the configuration does not form a valid push gateway URL, the native root certificates
    /// cannot be loaded, or the credentials cannot be encoded, an error variant will be returned
    /// describing the error.
    pub fn build(self) -> Result<PushGatewayPublisher, BuildError> {
        let base_url = self.config.base_url()?;

        let auth = self
            .config
            .username()
            .map(|name| push::basic_auth(name, self.config.password()))
            .transpose()
            .map_err(|e| BuildError::InvalidCredentials(e.to_string()))?;

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();
        let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(https);

        let dispatch = self.dispatch.unwrap_or_else(|| logging::dispatch(&self.config));

        Ok(PushGatewayPublisher { client, base_url, auth, dispatch, telemetry: Telemetry::new() })
    }
}

/// Publishes metrics to a Prometheus [push gateway].
///
/// Each metric of a batch is mangled into the Prometheus data model and pushed as its own gauge,
/// grouped by its labels. A metric that cannot be mangled, or whose push fails, is logged and
/// reported without affecting the rest of the batch.
///
/// [push gateway]: https://prometheus.io/docs/instrumenting/pushing/
pub struct PushGatewayPublisher {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    base_url: Uri,
    auth: Option<HeaderValue>,
    dispatch: Dispatch,
    telemetry: Telemetry,
}

impl PushGatewayPublisher {
    /// Base URL of the push gateway.
    pub fn base_url(&self) -> &Uri {
        &self.base_url
    }

    /// Publishes a batch of metrics.
    ///
    /// Metrics are pushed one at a time, in order.
    pub async fn publish(&self, metrics: &[RawMetric]) -> PublishReport {
        async move {
            let span = logging::publisher_span();
            self.publish_batch(metrics).instrument(span).await
        }
        .with_subscriber(self.dispatch.clone())
        .await
    }

    /// Publishes a batch of metrics, blocking the current thread until every metric is handled.
    ///
    /// # Errors
    ///
    /// If called from within an asynchronous runtime, or if the runtime used to drive the pushes
    /// cannot be created, an error will be returned. Use [`publish`](Self::publish) from async code.
    pub fn publish_blocking(&self, metrics: &[RawMetric]) -> io::Result<PublishReport> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "cannot block on publishing from within an asynchronous runtime",
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(runtime.block_on(self.publish(metrics)))
    }

    async fn publish_batch(&self, metrics: &[RawMetric]) -> PublishReport {
        debug!(url = %self.base_url, count = metrics.len(), "publishing metrics");

        let mut outcomes = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let outcome = match mangle(metric) {
                Ok(sanitized) => match self.push(&sanitized).await {
                    Ok(()) => Outcome::Pushed(sanitized),
                    Err(e) => {
                        error!(
                            name = %sanitized.name,
                            labels = ?sanitized.labels,
                            value = sanitized.value,
                            error = %e,
                            "error pushing to push gateway"
                        );
                        Outcome::Failed { metric: sanitized, error: e }
                    }
                },
                Err(e) => {
                    error!(error = %e, "error in decoding the metric");
                    Outcome::Skipped(e)
                }
            };

            self.telemetry.record(&outcome);
            outcomes.push(outcome);
        }

        let report = PublishReport { outcomes };
        debug!(
            pushed = report.pushed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "done with posting the metrics"
        );
        report
    }

    async fn push(&self, metric: &SanitizedMetric) -> Result<(), PushError> {
        let uri = push::grouping_url(&self.base_url, &metric.name, &metric.labels)?;
        let req = push::build_request(uri, self.auth.as_ref(), render_gauge(metric))?;

        let response = self.client.request(req).await?;
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map(Collected::to_bytes)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_else(|_| String::from("<failed to read response body>"));

        Err(PushError::UnexpectedStatus { status, body })
    }
}
