//! Error types for pagefeed
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Fatal configuration errors (unsupported source, unsupported pagination,
//! invalid keys) and recoverable transient failures are separate variants so
//! callers can pattern-match instead of inspecting messages. Transient
//! failures are retried by the fetch scheduler and only escalate to
//! [`Error::OutOfAttempts`] once the configured attempts are exhausted.

use crate::config::Config;
use crate::types::{ItemStream, JsonValue};
use futures::stream;
use std::fmt;
use thiserror::Error;

/// The main error type for pagefeed
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// The builder was misconfigured, e.g. an invalid page-in-path pattern.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// No source adapter variant matched the input.
    #[error("the provided source is not supported: {input}")]
    UnsupportedSource {
        /// The offending input.
        input: String,
    },

    /// No pagination strategy predicate matched the configuration.
    #[error("the provided configuration does not match any supported pagination")]
    UnsupportedPagination {
        /// The full configuration, for diagnostics.
        config: Box<Config>,
    },

    /// A received-response source lacks a backing request.
    #[error("the response was not produced by an actual HTTP request")]
    RequestNotSent,

    /// A configured key did not resolve to a usable value.
    #[error("the key [{key}] does not contain a valid value")]
    InvalidKey {
        /// The key that failed to resolve.
        key: String,
    },

    /// The page-in-path pattern did not match the request path.
    #[error("the pattern [{pattern}] does not match the path [{path}]")]
    InvalidPageInPath {
        /// The path that was probed.
        path: String,
        /// The configured pattern.
        pattern: String,
    },

    /// A custom pagination strategy reported a misconfiguration.
    #[error("invalid custom pagination: {message}")]
    InvalidPagination {
        /// What was wrong.
        message: String,
    },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    /// The underlying HTTP client failed to complete the exchange.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} returned by {url}")]
    HttpStatus {
        /// The status code.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// Every fetch attempt was exhausted; partial progress is preserved.
    #[error("out of attempts: {0}")]
    OutOfAttempts(Box<OutOfAttemptsError>),

    // ============================================================================
    // Data Errors
    // ============================================================================
    /// A page body was not valid JSON.
    #[error("failed to parse JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // User Code Errors
    // ============================================================================
    /// An error raised by a user-defined source or strategy.
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unsupported source error
    pub fn unsupported_source(input: impl Into<String>) -> Self {
        Self::UnsupportedSource {
            input: input.into(),
        }
    }

    /// Create an invalid key error
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Create an invalid custom pagination error
    pub fn invalid_pagination(message: impl Into<String>) -> Self {
        Self::InvalidPagination {
            message: message.into(),
        }
    }

    /// Whether this failure is transient and worth retrying.
    ///
    /// Connection and timeout errors, plus 408/429/5xx statuses, are
    /// transient; everything else is fatal and aborts the run immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::HttpStatus { status, .. } => {
                matches!(status, 408 | 429 | 500..=599)
            }
            _ => false,
        }
    }
}

/// The error raised after exhausting every fetch attempt.
///
/// Carries the original transport failure, the page numbers still
/// outstanding, and the items that were fetched successfully but not yet
/// yielded before the failure, so partial progress is never lost.
#[derive(Debug)]
pub struct OutOfAttemptsError {
    /// The original transport failure.
    pub cause: Box<Error>,
    /// The pages that could not be fetched.
    pub failed_pages: Vec<u64>,
    /// The items fetched successfully before the failure, in page order.
    pub items: Vec<JsonValue>,
}

impl OutOfAttemptsError {
    /// Replay the items fetched before the failure as a stream.
    pub fn replay(&self) -> ItemStream {
        Box::pin(stream::iter(
            self.items.clone().into_iter().map(Ok::<_, Error>),
        ))
    }

    /// Consume the container and return the fetched items.
    pub fn into_items(self) -> Vec<JsonValue> {
        self.items
    }
}

impl fmt::Display for OutOfAttemptsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} pages outstanding)",
            self.cause,
            self.failed_pages.len()
        )
    }
}

/// Result type alias for pagefeed
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "configuration error: test message");

        let err = Error::unsupported_source("42");
        assert_eq!(err.to_string(), "the provided source is not supported: 42");

        let err = Error::invalid_key("meta.total_pages");
        assert_eq!(
            err.to_string(),
            "the key [meta.total_pages] does not contain a valid value"
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(Error::HttpStatus {
            status: 500,
            url: String::new()
        }
        .is_retryable());
        assert!(Error::HttpStatus {
            status: 429,
            url: String::new()
        }
        .is_retryable());
        assert!(Error::HttpStatus {
            status: 503,
            url: String::new()
        }
        .is_retryable());

        assert!(!Error::HttpStatus {
            status: 404,
            url: String::new()
        }
        .is_retryable());
        assert!(!Error::config("nope").is_retryable());
        assert!(!Error::RequestNotSent.is_retryable());
    }

    #[test]
    fn out_of_attempts_replays_items() {
        let err = OutOfAttemptsError {
            cause: Box::new(Error::HttpStatus {
                status: 500,
                url: "https://example.com".into(),
            }),
            failed_pages: vec![3],
            items: vec![serde_json::json!({"id": 1}), serde_json::json!({"id": 2})],
        };

        assert_eq!(err.failed_pages, vec![3]);
        assert_eq!(err.into_items().len(), 2);
    }
}
