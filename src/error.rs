//! Error types for the spedition worker
//!
//! Each concern owns its own error enum; [`WorkerError`] aggregates them for
//! the binary.

use crate::config::ConfigError;
use crate::consignment::client::TransportError;
use crate::engine::EngineError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Maximum length of error text that leaves the process
const MAX_ERROR_MESSAGE_LEN: usize = 500;
const TRUNCATE_SUFFIX: &str = "...[truncated]";

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static USER_INFO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(https?://)[^/\s:@]+:[^/\s@]+@").expect("user info pattern is valid")
});

/// Main error type for worker operations
///
/// Task-level failures never surface here; the processor turns them into
/// engine failure reports. These are the errors that stop the binary.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Logistics client error: {0}")]
    Transport(#[from] TransportError),

    #[error("Task queue error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to render configuration: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    #[error("Signal handler error: {0}")]
    Signal(#[from] std::io::Error),
}

/// Redact secrets and embedded credentials, then cap the length
///
/// Applied to any error text reported to the engine.
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_PATTERN.replace_all(message, "${1}=***");
    let sanitized = USER_INFO_PATTERN
        .replace_all(&sanitized, "${1}***@")
        .to_string();

    if sanitized.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let keep = MAX_ERROR_MESSAGE_LEN - TRUNCATE_SUFFIX.len();
        let head: String = sanitized.chars().take(keep).collect();
        format!("{head}{TRUNCATE_SUFFIX}")
    } else {
        sanitized
    }
}

/// Result type for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_sanitization() {
        let sanitized =
            sanitize_error_message("Failed to authenticate: password=secret123 token=abc456");

        assert!(!sanitized.contains("secret123"));
        assert!(!sanitized.contains("abc456"));
        assert!(sanitized.contains("password=***"));
        assert!(sanitized.contains("token=***"));
    }

    #[test]
    fn test_user_info_is_redacted() {
        let sanitized = sanitize_error_message(
            "error sending request for url (http://group4:pw@engine:8080/x)",
        );
        assert!(!sanitized.contains("group4:pw"));
        assert!(sanitized.contains("http://***@engine:8080/x"));
    }

    #[test]
    fn test_long_message_truncation() {
        let sanitized = sanitize_error_message(&"x".repeat(600));

        assert_eq!(sanitized.chars().count(), 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_multibyte_truncation_does_not_panic() {
        let sanitized = sanitize_error_message(&"ü".repeat(600));
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_sanitize_exactly_500_chars() {
        let message = "x".repeat(500);
        let sanitized = sanitize_error_message(&message);
        assert_eq!(sanitized.len(), 500);
        assert!(!sanitized.contains("truncated"));
    }

    #[test]
    fn test_sanitize_empty_message() {
        assert_eq!(sanitize_error_message(""), "");
    }

    #[test]
    fn test_conversions_from_component_errors() {
        let error: WorkerError = TransportError::InvalidEndpoint("not-a-url".to_string()).into();
        assert_eq!(
            error.to_string(),
            "Logistics client error: invalid provider endpoint: not-a-url"
        );

        let error: WorkerError = EngineError::InvalidConfig("bad url".to_string()).into();
        assert_eq!(
            error.to_string(),
            "Task queue error: Invalid engine configuration: bad url"
        );

        let error: WorkerError = ConfigError::InvalidConfig("lock_duration_ms".to_string()).into();
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration: lock_duration_ms"
        );

        let error: WorkerError =
            std::io::Error::new(std::io::ErrorKind::Unsupported, "no signals").into();
        assert!(matches!(error, WorkerError::Signal(_)));
    }
}
