//! Error types for typed requests.
//!
//! A single [`Error`] covers the whole pipeline: problems detected while building a
//! request, failures of a decoding strategy, and the transport errors a backend
//! passes through unchanged. Every variant is `Clone` so a resolved
//! [`Future`](crate::future::Future) can hand the same failure to many observers.

use http::{HeaderMap, StatusCode};
use std::sync::Arc;

/// The main error type for typed requests.
///
/// # Examples
///
/// ```
/// use hyperspace::decoding::{decode_root_key, DecoderConfig};
/// use hyperspace::Error;
///
/// let result = decode_root_key::<u32>(br#"{"other": 1}"#, "data", &DecoderConfig::default());
///
/// match result {
///     Err(Error::ValueNotFound { key, .. }) => assert_eq!(key, "data"),
///     other => panic!("unexpected result: {:?}", other),
/// }
/// ```
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The request could not be built from the given parameters.
    ///
    /// Raised for malformed or unsupported URLs and for invalid header names or
    /// values.
    /// Never retried.
    #[error("Construction error: {0}")]
    ConstructionError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The response bytes do not match the schema of the decoding strategy.
    ///
    /// Covers both malformed JSON and well-formed JSON of the wrong shape.
    ///
    /// # Fields
    ///
    /// * `raw_response` - The raw response body (lossily converted to UTF-8)
    /// * `serde_error` - The error message from serde, including line and column
    #[error("Failed to decode response: {serde_error}")]
    DecodingFailed {
        /// The raw response body that failed to decode
        raw_response: String,
        /// The serde error message
        serde_error: String,
    },

    /// A root-key decode could not find its key in the response envelope.
    ///
    /// # Fields
    ///
    /// * `key` - The root key that was looked up
    /// * `path` - The path of the object that was searched (`$` for the document root)
    #[error("No value found at root key \"{key}\" (searched {path})")]
    ValueNotFound {
        /// The missing key
        key: String,
        /// The path that was searched
        path: String,
    },

    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    /// The request timed out.
    ///
    /// This occurs when the exchange takes longer than the request's timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server returned a non-2xx HTTP status code.
    ///
    /// # Fields
    ///
    /// * `status` - The HTTP status code
    /// * `raw_response` - The raw response body
    /// * `headers` - The response headers
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// The backend was configured incorrectly.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(Arc::new(err))
        }
    }
}

impl Error {
    /// Returns `true` if this error is potentially recoverable by re-issuing the request.
    ///
    /// Network errors, timeouts, 5xx and 429 responses are considered retryable.
    /// Construction and decoding failures are deterministic and never are.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperspace::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     raw_response: "try later".to_string(),
    ///     headers: http::HeaderMap::new(),
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::ValueNotFound {
    ///     key: "data".to_string(),
    ///     path: "$".to_string(),
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Timeout => true,
            Error::HttpError { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Error::ConstructionError(_)
            | Error::SerializationFailed(_)
            | Error::DecodingFailed { .. }
            | Error::ValueNotFound { .. }
            | Error::ConfigurationError(_) => false,
        }
    }

    /// Returns `true` if the request could not be built.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::ConstructionError(_) | Error::SerializationFailed(_)
        )
    }

    /// Returns `true` if this error was produced by a decoding strategy.
    pub fn is_decoding(&self) -> bool {
        matches!(
            self,
            Error::DecodingFailed { .. } | Error::ValueNotFound { .. }
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DecodingFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for typed requests.
pub type Result<T> = std::result::Result<T, Error>;
