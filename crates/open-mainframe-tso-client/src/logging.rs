//! Structured logging setup for binaries built on the TSO client.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// One line per event.
    Compact,
    /// JSON for log aggregation.
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names give text.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Text,
        }
    }
}

/// Tracing initialization errors.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to initialize tracing: {0}")]
    InitError(String),
}

/// Install a global subscriber writing to stderr.
///
/// `RUST_LOG` wins over `default_filter`. Fails if a subscriber is already set.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> Result<(), TracingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| TracingError::InitError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
    }

    #[test]
    fn test_second_init_is_init_error() {
        let _ = init_tracing("warn", LogFormat::Compact);
        let err = init_tracing("warn", LogFormat::Json).unwrap_err();
        assert!(matches!(err, TracingError::InitError(_)));
        assert!(err.to_string().starts_with("failed to initialize tracing"));
    }
}
