//! Logging for the publisher.
//!
//! Verbosity comes from the [`Configuration`] handed to each publisher rather than from a
//! process-wide setting: the publisher builds its own [`Dispatch`] and runs its work under it, so
//! two publishers configured differently in the same process each log at their own level.
use tracing::{Dispatch, Span};

use crate::config::Configuration;
use crate::{PLUGIN_NAME, PLUGIN_TYPE, PLUGIN_VERSION};

/// Builds the dispatcher a publisher logs through.
///
/// Events are written in the standard `tracing-subscriber` format, filtered at
/// [`Configuration::log_level`].
pub fn dispatch(config: &Configuration) -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_target(false)
        .finish();

    Dispatch::new(subscriber)
}

/// Creates the span that every publish runs within.
pub fn publisher_span() -> Span {
    tracing::error_span!(
        "publisher",
        plugin_name = PLUGIN_NAME,
        plugin_version = PLUGIN_VERSION,
        plugin_type = PLUGIN_TYPE,
    )
}

#[cfg(test)]
mod tests {
    use super::{dispatch, publisher_span};
    use crate::config::Configuration;

    #[test]
    fn test_dispatch_honors_configured_level() {
        let quiet = dispatch(&Configuration::new("localhost", 9091));
        tracing::dispatcher::with_default(&quiet, || {
            assert!(!tracing::enabled!(tracing::Level::INFO));
            assert!(tracing::enabled!(tracing::Level::WARN));
        });

        let verbose = dispatch(&Configuration::new("localhost", 9091).with_debug(true));
        tracing::dispatcher::with_default(&verbose, || {
            assert!(tracing::enabled!(tracing::Level::DEBUG));
            assert!(!tracing::enabled!(tracing::Level::TRACE));
        });
    }

    #[test]
    fn test_publisher_span_is_enabled_at_any_level() {
        let quiet = dispatch(&Configuration::new("localhost", 9091).with_log_level("error"));
        tracing::dispatcher::with_default(&quiet, || {
            assert!(!publisher_span().is_disabled());
        });
    }
}
