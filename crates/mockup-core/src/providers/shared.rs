//! Helpers shared by image service providers.

use std::fmt;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::capability::CapabilityFailure;

/// Standard User-Agent header for mockup API requests.
pub const USER_AGENT: &str = concat!("mockup/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Config resolution helpers
// ============================================================================

/// Resolves an API key with precedence: config > env.
///
/// # Errors
/// Returns an error if neither the config value nor `env_var` is set.
pub fn resolve_api_key(
    config_api_key: Option<&str>,
    env_var: &str,
    config_section: &str,
) -> Result<String> {
    if let Some(key) = config_api_key {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    std::env::var(env_var)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .with_context(|| {
            format!(
                "No API key available. Set {env_var} or api_key in [providers.{config_section}]."
            )
        })
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL does not parse.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    provider_name: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str, provider_name: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {provider_name} base URL: {url}"))?;
    Ok(())
}

// ============================================================================
// Provider errors
// ============================================================================

/// Provider error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection timeout or request timeout
    Timeout,
    /// Failed to parse the response body
    Parse,
    /// The API answered but refused to produce an image
    ApiError,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::HttpStatus => write!(f, "http_status"),
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::ApiError => write!(f, "api_error"),
        }
    }
}

/// Structured provider error.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, extracting `error.message` from JSON bodies.
    pub fn http_status(status: u16, body: &str) -> Self {
        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = json
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
        {
            return Self {
                kind: ProviderErrorKind::HttpStatus,
                message: format!("HTTP {status}: {msg}"),
                details: Some(body.to_string()),
            };
        }

        Self {
            kind: ProviderErrorKind::HttpStatus,
            message: format!("HTTP {status}"),
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Parse, message)
    }

    pub fn api_error(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ApiError, message)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for CapabilityFailure {
    fn from(error: ProviderError) -> Self {
        if let Some(details) = &error.details {
            tracing::debug!(kind = %error.kind, details = %details, "provider error details");
        }
        CapabilityFailure::new(error.message)
    }
}

/// Maps a reqwest transport error onto a [`ProviderError`].
pub fn classify_reqwest_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::timeout(format!("Connection failed: {e}"))
    } else if e.is_request() {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Request error: {e}"))
    } else {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Network error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_extracts_json_error_message() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#;
        let err = ProviderError::http_status(429, body);
        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 429: Resource has been exhausted");
        assert_eq!(err.details.as_deref(), Some(body));
    }

    #[test]
    fn http_status_keeps_plain_body_as_details() {
        let err = ProviderError::http_status(502, "Bad Gateway");
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.details.as_deref(), Some("Bad Gateway"));

        let empty = ProviderError::http_status(500, "");
        assert_eq!(empty.details, None);
    }

    #[test]
    fn provider_error_becomes_capability_failure_with_message() {
        let failure: CapabilityFailure = ProviderError::api_error("Blocked: SAFETY").into();
        assert_eq!(failure.message.as_deref(), Some("Blocked: SAFETY"));
    }

    #[test]
    fn resolve_api_key_prefers_config() {
        let key = resolve_api_key(Some("  from-config "), "MOCKUP_TEST_UNSET_KEY", "gemini");
        assert_eq!(key.unwrap(), "from-config");
    }

    #[test]
    fn resolve_api_key_reports_missing_key() {
        let err = resolve_api_key(None, "MOCKUP_TEST_UNSET_KEY", "gemini").unwrap_err();
        assert!(err.to_string().contains("[providers.gemini]"));
    }

    #[test]
    fn resolve_base_url_validates_config_value() {
        let url = resolve_base_url(
            Some("http://localhost:8080/v1beta/"),
            "MOCKUP_TEST_UNSET_URL",
            "https://example.com",
            "Gemini",
        )
        .unwrap();
        assert_eq!(url, "http://localhost:8080/v1beta");

        assert!(
            resolve_base_url(
                Some("not a url"),
                "MOCKUP_TEST_UNSET_URL",
                "https://example.com",
                "Gemini"
            )
            .is_err()
        );
    }
}
