use std::collections::BTreeMap;

use base64::prelude::{BASE64_STANDARD, BASE64_URL_SAFE_NO_PAD};
use base64::Engine as _;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode, Uri};
use thiserror::Error;

use crate::formatting::valid_label_key_character;

/// Content type of the text exposition format.
pub(crate) const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

/// Errors that could occur while pushing a single metric.
#[derive(Debug, Error)]
pub enum PushError {
    /// The grouping URL for the metric is not a valid URI.
    #[error("invalid push gateway URL: {0}")]
    InvalidUri(String),

    /// A label cannot be used as part of the grouping key.
    #[error("invalid grouping label name {0:?}")]
    InvalidLabelName(String),

    /// The request could not be built.
    #[error("failed to build push gateway request: {0}")]
    Request(String),

    /// The request could not be sent.
    #[error("error sending request to push gateway: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    /// The push gateway responded with a non-success status.
    #[error("unexpected status after pushing metrics to push gateway: {status}: {body}")]
    UnexpectedStatus {
        /// Status of the response.
        status: StatusCode,
        /// Body of the response, if it could be read.
        body: String,
    },
}

/// Builds the URL a metric is pushed to.
///
/// The job is the metric name, and every label becomes part of the grouping key, in key order:
/// `<base>/metrics/job/<job>/<label>/<value>...`. Values that are empty or contain anything but
/// URL-unreserved characters are sent base64-encoded, as `<label>@base64/<encoded>`.
///
/// Label names are written as-is, so each must be a valid Prometheus label name other than `job`.
pub(crate) fn grouping_url(
    base: &Uri,
    job: &str,
    labels: &BTreeMap<String, String>,
) -> Result<Uri, PushError> {
    let base = base.to_string();
    let mut url = String::from(base.trim_end_matches('/'));
    url.push_str("/metrics");
    push_grouping_segment(&mut url, "job", job);
    for (key, value) in labels {
        if key == "job" || !is_valid_label_name(key) {
            return Err(PushError::InvalidLabelName(key.clone()));
        }
        push_grouping_segment(&mut url, key, value);
    }

    url.parse::<Uri>().map_err(|e| PushError::InvalidUri(format!("{url}: {e}")))
}

fn push_grouping_segment(url: &mut String, name: &str, value: &str) {
    url.push('/');
    url.push_str(name);
    if value.is_empty() {
        url.push_str("@base64/=");
    } else if value.bytes().all(is_unreserved) {
        url.push('/');
        url.push_str(value);
    } else {
        url.push_str("@base64/");
        url.push_str(&BASE64_URL_SAFE_NO_PAD.encode(value));
    }
}

fn is_valid_label_name(name: &str) -> bool {
    // Needs to match the regex pattern of [a-zA-Z_][a-zA-Z0-9_]*.
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(valid_label_key_character),
        _ => false,
    }
}

#[inline]
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Builds the `Authorization` header for HTTP basic authentication.
pub(crate) fn basic_auth(
    username: &str,
    password: Option<&str>,
) -> Result<HeaderValue, hyper::header::InvalidHeaderValue> {
    let credentials = format!("{}:{}", username, password.unwrap_or_default());
    let mut header = HeaderValue::from_str(&format!("Basic {}", BASE64_STANDARD.encode(credentials)))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Builds the `PUT` request that replaces the metrics of a group with `body`.
pub(crate) fn build_request(
    uri: Uri,
    auth: Option<&HeaderValue>,
    body: String,
) -> Result<Request<Full<Bytes>>, PushError> {
    let mut builder = Request::builder().method(Method::PUT).uri(uri).header(CONTENT_TYPE, TEXT_FORMAT);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth.clone());
    }

    builder.body(Full::from(body)).map_err(|e| PushError::Request(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use base64::prelude::BASE64_STANDARD;
    use base64::Engine as _;
    use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
    use hyper::{Method, Uri};

    use super::{basic_auth, build_request, grouping_url, PushError, TEXT_FORMAT};

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_grouping_url_plain_values() {
        let base = Uri::from_static("http://localhost:9091");
        let url = grouping_url(
            &base,
            "intel_cpu_usage",
            &labels(&[("unit", "percent"), ("host", "node-1"), ("cpu_id", "0")]),
        )
        .unwrap();

        assert_eq!(
            "http://localhost:9091/metrics/job/intel_cpu_usage/cpu_id/0/host/node-1/unit/percent",
            url.to_string()
        );
    }

    #[test]
    fn test_grouping_url_encodes_awkward_values() {
        let base = Uri::from_static("https://pushgw.example.com:443/");
        let url = grouping_url(&base, "disk_free", &labels(&[("fs", "/var/lib"), ("unit", "")]))
            .unwrap();

        // "/var/lib" is "L3Zhci9saWI" in URL-safe base64 without padding.
        assert_eq!(
            "https://pushgw.example.com:443/metrics/job/disk_free/fs@base64/L3Zhci9saWI/unit@base64/=",
            url.to_string()
        );
    }

    #[test]
    fn test_grouping_url_encodes_empty_job() {
        let base = Uri::from_static("http://localhost:9091");
        let url = grouping_url(&base, "", &BTreeMap::new()).unwrap();
        assert_eq!("http://localhost:9091/metrics/job@base64/=", url.to_string());
    }

    #[test]
    fn test_grouping_url_rejects_invalid_label_names() {
        let base = Uri::from_static("http://localhost:9091");
        for key in ["", "dev/name", "1st", "node.id", "job"] {
            let result = grouping_url(&base, "disk", &labels(&[(key, "sda")]));
            match result {
                Err(PushError::InvalidLabelName(name)) => assert_eq!(key, name),
                other => panic!("label {:?} should have been rejected: {:?}", key, other),
            }
        }

        assert!(grouping_url(&base, "disk", &labels(&[("_dev", "sda"), ("Dev2", "x")])).is_ok());
    }

    #[test]
    #[allow(clippy::similar_names)]
    fn test_basic_auth() {
        const BASIC: &str = "Basic ";

        // username only
        let header = basic_auth("metrics", None).unwrap();
        let decoded = BASE64_STANDARD.decode(&header.as_bytes()[BASIC.len()..]).unwrap();
        assert_eq!(b"metrics:", &decoded[..]);
        assert!(header.is_sensitive());

        // username/password
        let header = basic_auth("metrics", Some("123!_@ABC")).unwrap();
        let decoded = BASE64_STANDARD.decode(&header.as_bytes()[BASIC.len()..]).unwrap();
        assert_eq!(b"metrics:123!_@ABC", &decoded[..]);
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_build_request() {
        let uri = Uri::from_static("http://localhost:9091/metrics/job/up");
        let auth = basic_auth("metrics", None).unwrap();
        let req = build_request(uri.clone(), Some(&auth), String::from("up 1\n")).unwrap();

        assert_eq!(Method::PUT, *req.method());
        assert_eq!(&uri, req.uri());
        assert_eq!(TEXT_FORMAT, req.headers()[CONTENT_TYPE].to_str().unwrap());
        assert_eq!(auth, req.headers()[AUTHORIZATION]);

        let req = build_request(uri, None, String::new()).unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }
}
