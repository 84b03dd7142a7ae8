//! Logging integration for quill.
//!
//! Provides a helper for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and a span constructor used by the
//! query builders so that all events for one statement share a context.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The log level is read from `settings.log_level` (e.g. "debug", "info",
/// "`quill_db=trace`"). In debug mode a pretty, human-readable format is used;
/// otherwise a structured JSON format is used. Installing a second subscriber
/// is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one statement issued against a database.
///
/// # Examples
///
/// ```
/// use quill_core::logging::statement_span;
///
/// let span = statement_span("SQLite", "SELECT 1");
/// let _guard = span.enter();
/// tracing::debug!("executing");
/// ```
pub fn statement_span(product: &str, sql: &str) -> tracing::Span {
    tracing::debug_span!("statement", db = product, sql = sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = Settings::default();
        setup_logging(&settings);
        setup_logging(&settings);
        tracing::info!("still logging");
    }

    #[test]
    fn test_statement_span_enter() {
        let span = statement_span("SQLite", "SELECT 1");
        let _guard = span.enter();
        tracing::debug!("inside statement span");
    }
}
