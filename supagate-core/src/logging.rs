use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::GatewayError;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (text, json, compact)
    pub format: LogFormat,
    /// Whether to include file and line numbers
    pub include_location: bool,
    /// Whether to include thread information
    pub include_thread_id: bool,
    /// Whether to emit span open/close events
    pub include_spans: bool,
}

/// Log output formats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact text format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(GatewayError::validation(format!(
                "Invalid log format: {}. Valid formats are: text, json, compact",
                other
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            include_location: true,
            include_thread_id: false,
            include_spans: true,
        }
    }
}

/// Initialize the global subscriber with the given configuration
pub fn init_logging(config: &LogConfig) -> crate::Result<()> {
    validate_log_level(&config.level)?;

    let directive: Directive = format!("supagate={}", config.level)
        .parse()
        .map_err(|e| GatewayError::config(format!("Invalid log directive: {}", e)))?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level))
        .add_directive(directive);

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(config.include_thread_id)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_span_events(span_events)
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(config.include_thread_id)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_span_events(span_events)
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.include_location)
                    .with_thread_ids(config.include_thread_id)
                    .with_writer(io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| GatewayError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );

    Ok(())
}

fn validate_log_level(level: &str) -> crate::Result<()> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(GatewayError::validation(format!(
            "Invalid log level: {}. Valid levels are: trace, debug, info, warn, error",
            level
        ))),
    }
}

/// Configure logging for the gateway server from `RUST_LOG` and `LOG_FORMAT`
pub fn init_server_logging() -> crate::Result<()> {
    let format = std::env::var("LOG_FORMAT")
        .unwrap_or_default()
        .parse()
        .unwrap_or(LogFormat::Text);
    // Directive lists such as `supagate=debug,tower_http=info` are still honoured
    // through EnvFilter::try_from_default_env; only a bare level becomes the base level.
    let level = std::env::var("RUST_LOG")
        .ok()
        .filter(|level| validate_log_level(level).is_ok())
        .unwrap_or_else(|| "info".to_string());
    let config = LogConfig {
        level,
        format,
        include_location: true,
        include_thread_id: true,
        include_spans: false,
    };
    init_logging(&config)
}

/// Correlation ID attached to every log line of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new correlation ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structured logging context for one gateway operation
pub struct LogContext {
    correlation_id: CorrelationId,
    operation: String,
    component: String,
}

impl LogContext {
    /// Create a new log context
    pub fn new(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            operation: operation.into(),
            component: component.into(),
        }
    }

    /// Create with existing correlation ID
    pub fn with_correlation_id(
        correlation_id: CorrelationId,
        operation: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            operation: operation.into(),
            component: component.into(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Create a tracing span for this context
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "operation",
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            component = %self.component
        )
    }

    pub fn info(&self, message: &str) {
        let _guard = self.span().entered();
        tracing::info!("{}", message);
    }

    pub fn warn(&self, message: &str) {
        let _guard = self.span().entered();
        tracing::warn!("{}", message);
    }

    pub fn error(&self, message: &str) {
        let _guard = self.span().entered();
        tracing::error!("{}", message);
    }

    pub fn debug(&self, message: &str) {
        let _guard = self.span().entered();
        tracing::debug!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_validation() {
        assert!(validate_log_level("debug").is_ok());
        assert!(validate_log_level("WARN").is_ok()); // case insensitive
        assert!(validate_log_level("verbose").is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("Compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_correlation_id() {
        let id1 = CorrelationId::new();
        let id2 = CorrelationId::new();
        assert_ne!(id1.as_str(), id2.as_str());

        let custom_id = CorrelationId::from_string("req-42".to_string());
        assert_eq!(custom_id.to_string(), "req-42");
    }

    #[test]
    fn test_log_context() {
        let context = LogContext::with_correlation_id(
            CorrelationId::from_string("req-1".to_string()),
            "create_table",
            "supagate-server",
        );
        assert_eq!(context.operation(), "create_table");
        assert_eq!(context.component(), "supagate-server");
        assert_eq!(context.correlation_id().as_str(), "req-1");
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.include_location);
    }
}
