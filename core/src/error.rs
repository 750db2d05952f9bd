//! Error types for webhook building, dispatch and configuration.
//!
//! # Design
//! A blank request URL and a failed transport call are the only two ways a
//! dispatch can go wrong. Both are reported against the feed and never
//! abort the submission that triggered them. A response with an error status
//! is not an error here; it is logged and the dispatch counts as complete.

use thiserror::Error;

/// Errors produced while building or dispatching a webhook request.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The request URL resolved to an empty string after merge-tag
    /// replacement and filtering. No HTTP call is made.
    #[error("Webhook was not processed because request URL was empty.")]
    EmptyRequestUrl,

    /// The payload could not be encoded as JSON.
    #[error("Webhook was not processed because the request body could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP call failed below the HTTP layer (DNS, connect, TLS, timeout).
    #[error("Webhook was not successfully executed. {0}")]
    Transport(#[from] TransportError),
}

/// A transport-level failure reported by the HTTP primitive.
///
/// `code` is a short machine-readable identifier such as
/// `http_request_failed`; `message` is the human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({code})")]
pub struct TransportError {
    pub message: String,
    pub code: String,
}

impl TransportError {
    /// Code used for every failure the bundled transport reports.
    pub const REQUEST_FAILED: &'static str = "http_request_failed";

    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::new(message, Self::REQUEST_FAILED)
    }
}

/// Errors raised while loading [`SiteConfig`](crate::config::SiteConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_message_matches_feed_error_text() {
        assert_eq!(
            WebhookError::EmptyRequestUrl.to_string(),
            "Webhook was not processed because request URL was empty."
        );
    }

    #[test]
    fn transport_error_message_includes_code() {
        let err = WebhookError::from(TransportError::request_failed("cURL error 6: Could not resolve host"));
        assert_eq!(
            err.to_string(),
            "Webhook was not successfully executed. cURL error 6: Could not resolve host (http_request_failed)"
        );
    }
}
