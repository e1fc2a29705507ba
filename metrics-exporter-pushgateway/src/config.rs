//! Publisher configuration.
//!
//! The collection framework hands publishers a loosely-typed key/value map. [`ConfigPolicy`]
//! describes which keys the publisher understands, and [`Configuration::from_map`] validates a map
//! against it.
use std::collections::HashMap;
use std::fmt;

use hyper::Uri;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// Placeholder recorded when no log level is configured.
pub const UNDEFINED_LOG_LEVEL: &str = "undefined";

/// A configuration value.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    /// A string.
    String(String),
    /// An integer.
    Int(i64),
    /// A boolean.
    Bool(bool),
    /// A float.
    Float(f64),
}

impl ConfigValue {
    fn kind(&self) -> ConfigKind {
        match self {
            ConfigValue::String(_) => ConfigKind::String,
            ConfigValue::Int(_) => ConfigKind::Int,
            ConfigValue::Bool(_) => ConfigKind::Bool,
            ConfigValue::Float(_) => ConfigKind::Float,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

/// The type a configuration key expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigKind {
    /// A string.
    String,
    /// An integer.
    Int,
    /// A boolean.
    Bool,
    /// A float.
    Float,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigKind::String => "string",
            ConfigKind::Int => "integer",
            ConfigKind::Bool => "boolean",
            ConfigKind::Float => "float",
        })
    }
}

/// A single rule of a [`ConfigPolicy`].
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigRule {
    /// Key the rule applies to.
    pub key: &'static str,
    /// Expected type of the value.
    pub kind: ConfigKind,
    /// Whether or not the key must be present.
    pub required: bool,
    /// Value used when the key is absent.
    pub default: Option<ConfigValue>,
}

impl ConfigRule {
    const fn required(key: &'static str, kind: ConfigKind) -> Self {
        Self { key, kind, required: true, default: None }
    }

    const fn optional(key: &'static str, kind: ConfigKind) -> Self {
        Self { key, kind, required: false, default: None }
    }

    fn with_default(mut self, default: ConfigValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// The set of configuration keys understood by the publisher.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigPolicy {
    rules: Vec<ConfigRule>,
}

impl ConfigPolicy {
    /// Creates the publisher's configuration policy.
    pub fn new() -> Self {
        let rules = vec![
            ConfigRule::required("host", ConfigKind::String),
            ConfigRule::required("port", ConfigKind::Int),
            ConfigRule::optional("https", ConfigKind::Bool).with_default(ConfigValue::Bool(false)),
            ConfigRule::optional("debug", ConfigKind::Bool).with_default(ConfigValue::Bool(false)),
            ConfigRule::optional("log-level", ConfigKind::String),
            ConfigRule::optional("username", ConfigKind::String),
            ConfigRule::optional("password", ConfigKind::String),
        ];

        Self { rules }
    }

    /// Rules of this policy, in declaration order.
    pub fn rules(&self) -> &[ConfigRule] {
        &self.rules
    }

    /// Looks up the rule for `key`.
    pub fn rule(&self, key: &str) -> Option<&ConfigRule> {
        self.rules.iter().find(|rule| rule.key == key)
    }
}

impl Default for ConfigPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that could occur while validating a configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A required key was not present.
    #[error("missing required configuration key: {key}")]
    Missing {
        /// The missing key.
        key: &'static str,
    },

    /// A key was present with a value of the wrong type.
    #[error("configuration key {key} must be a {expected}")]
    InvalidType {
        /// The offending key.
        key: &'static str,
        /// The type the key expects.
        expected: ConfigKind,
    },

    /// The port is not a valid TCP port.
    #[error("invalid port: {0}")]
    InvalidPort(i64),

    /// The host and port do not form a valid URL.
    #[error("invalid push gateway URL: {0}")]
    InvalidUrl(String),
}

/// Validated publisher configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    host: String,
    port: u16,
    https: bool,
    debug: bool,
    log_level: String,
    username: Option<String>,
    password: Option<String>,
}

impl Configuration {
    /// Creates a configuration for the push gateway at `host:port`, with every optional setting at
    /// its default.
    pub fn new<H: Into<String>>(host: H, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            https: false,
            debug: false,
            log_level: UNDEFINED_LOG_LEVEL.to_string(),
            username: None,
            password: None,
        }
    }

    /// Validates a configuration map against the publisher's [`ConfigPolicy`].
    ///
    /// Keys not covered by the policy are ignored.
    ///
    /// # Errors
    ///
    /// If a required key is missing, a key holds a value of the wrong type, or the port is out of
    /// range, an error variant will be returned describing the problem.
    pub fn from_map(values: &HashMap<String, ConfigValue>) -> Result<Self, ConfigError> {
        let policy = ConfigPolicy::new();
        let lookup = |key: &'static str| -> Result<Option<ConfigValue>, ConfigError> {
            let Some(rule) = policy.rule(key) else {
                return Ok(values.get(key).cloned());
            };

            match values.get(key).cloned().or_else(|| rule.default.clone()) {
                Some(value) if value.kind() == rule.kind => Ok(Some(value)),
                Some(_) => Err(ConfigError::InvalidType { key, expected: rule.kind }),
                None if rule.required => Err(ConfigError::Missing { key }),
                None => Ok(None),
            }
        };

        let host = match lookup("host")? {
            Some(ConfigValue::String(host)) => host,
            _ => return Err(ConfigError::Missing { key: "host" }),
        };
        let port = match lookup("port")? {
            Some(ConfigValue::Int(port)) => {
                u16::try_from(port).ok().filter(|p| *p != 0).ok_or(ConfigError::InvalidPort(port))?
            }
            _ => return Err(ConfigError::Missing { key: "port" }),
        };

        let mut config = Self::new(host, port);
        if let Some(ConfigValue::Bool(https)) = lookup("https")? {
            config.https = https;
        }
        if let Some(ConfigValue::Bool(debug)) = lookup("debug")? {
            config.debug = debug;
        }
        if let Some(ConfigValue::String(level)) = lookup("log-level")? {
            config.log_level = level;
        }
        if let Some(ConfigValue::String(username)) = lookup("username")? {
            config.username = Some(username);
        }
        if let Some(ConfigValue::String(password)) = lookup("password")? {
            config.password = Some(password);
        }

        Ok(config)
    }

    /// Sets whether or not to push over HTTPS.
    #[must_use]
    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    /// Sets whether or not debug logging is enabled.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn with_log_level<L: Into<String>>(mut self, level: L) -> Self {
        self.log_level = level.into();
        self
    }

    /// Sets the credentials used for HTTP basic authentication.
    #[must_use]
    pub fn with_basic_auth(mut self, username: String, password: Option<String>) -> Self {
        self.username = Some(username);
        self.password = password;
        self
    }

    /// Host of the push gateway.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port of the push gateway.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether or not to push over HTTPS.
    pub fn https(&self) -> bool {
        self.https
    }

    /// Whether or not debug logging is enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Username for basic authentication, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password for basic authentication, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// The configured log level, verbatim.
    pub fn log_level_name(&self) -> &str {
        &self.log_level
    }

    /// Maximum level the publisher logs at.
    ///
    /// Debug mode always wins. Otherwise a recognized `log-level` is used, falling back to `WARN`.
    pub fn log_level(&self) -> LevelFilter {
        if self.debug {
            return LevelFilter::DEBUG;
        }

        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" | "warning" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            "off" => LevelFilter::OFF,
            _ => LevelFilter::WARN,
        }
    }

    /// Base URL of the push gateway, in the form of `scheme://host:port`.
    ///
    /// # Errors
    ///
    /// If the host does not form a valid URL authority, an error will be returned.
    pub fn base_url(&self) -> Result<Uri, ConfigError> {
        let scheme = if self.https { "https" } else { "http" };
        let url = format!("{}://{}:{}", scheme, self.host, self.port);
        let uri = url.parse::<Uri>().map_err(|e| ConfigError::InvalidUrl(format!("{url}: {e}")))?;

        // A host with a path or query sneaks past the parser, but isn't a valid base.
        if uri.path() != "/" || uri.query().is_some() {
            return Err(ConfigError::InvalidUrl(url));
        }

        Ok(uri)
    }
}
