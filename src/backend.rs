//! The callback-based transport contract and its `reqwest` implementation.
//!
//! [`BackendService`] is the contract the rest of the crate is written against:
//! execute a request and call a completion handler exactly once with the decoded
//! result. [`Backend`] implements it on top of `reqwest`, running each exchange on
//! a tokio task so `execute` never blocks the caller.

use crate::recovery::{Recoverable, RecoveryDisposition, RecoveryStrategy};
use crate::request::Request;
use crate::{Error, Result};
use http::header::CACHE_CONTROL;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// A transport that performs requests and reports their outcome through a callback.
///
/// Implementations must call `completion` at most once per `execute` call and must
/// not block the caller. Transport failures reach the caller converted through
/// `From<Error>`; decoding is done by [`Request::transform`].
pub trait BackendService {
    /// Performs `request` and calls `completion` with its decoded result.
    fn execute<R, F>(&self, request: R, completion: F)
    where
        R: Request + Send + Sync + 'static,
        R::Response: Send + 'static,
        R::Error: From<Error> + Send + 'static,
        F: FnOnce(std::result::Result<R::Response, R::Error>) + Send + 'static;

    /// Performs `recoverable`, re-issuing it on failure as the transport sees fit,
    /// and calls `completion` once with the final result.
    fn execute_recoverable<R, F>(&self, recoverable: R, completion: F)
    where
        R: Recoverable + Send + Sync + 'static,
        R::Response: Send + 'static,
        R::Error: From<Error> + Send + 'static,
        F: FnOnce(std::result::Result<R::Response, R::Error>) + Send + 'static;
}

/// A [`BackendService`] backed by `reqwest`.
///
/// The backend is cheap to clone and designed to be shared by many requests.
///
/// # Examples
///
/// ```no_run
/// use hyperspace::{Backend, BackendService, TypedRequest};
/// use hyperspace::recovery::RecoverOnRetryable;
/// use http::Method;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), hyperspace::Error> {
/// let backend = Backend::builder()
///     .default_header("User-Agent", "my-app/1.0")?
///     .recovery_strategy(Box::new(RecoverOnRetryable {
///         delay: Duration::from_millis(200),
///     }))
///     .build()?;
///
/// let request = TypedRequest::builder(Method::GET, "https://api.example.com/status")?
///     .decode::<serde_json::Value>();
///
/// backend.execute(request, |result| match result {
///     Ok(status) => println!("Status: {}", status),
///     Err(e) => eprintln!("Failed: {}", e),
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

struct BackendInner {
    http_client: reqwest::Client,
    default_headers: HeaderMap,
    recovery_strategies: Vec<Box<dyn RecoveryStrategy>>,
    runtime: Handle,
}

impl Backend {
    /// Creates a new `BackendBuilder` for configuring a backend.
    pub fn builder() -> BackendBuilder {
        BackendBuilder::new()
    }
}

impl BackendService for Backend {
    fn execute<R, F>(&self, request: R, completion: F)
    where
        R: Request + Send + Sync + 'static,
        R::Response: Send + 'static,
        R::Error: From<Error> + Send + 'static,
        F: FnOnce(std::result::Result<R::Response, R::Error>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let result = match inner.send(&request, 1).await {
                Ok(body) => inner.decode(&request, &body),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        method = %request.method(),
                        url = %request.url(),
                        "Request failed"
                    );
                    Err(R::Error::from(e))
                }
            };
            completion(result);
        });
    }

    fn execute_recoverable<R, F>(&self, recoverable: R, completion: F)
    where
        R: Recoverable + Send + Sync + 'static,
        R::Response: Send + 'static,
        R::Error: From<Error> + Send + 'static,
        F: FnOnce(std::result::Result<R::Response, R::Error>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let result = inner.run_recoverable(recoverable).await;
            completion(result);
        });
    }
}

impl BackendInner {
    async fn run_recoverable<R>(&self, recoverable: R) -> std::result::Result<R::Response, R::Error>
    where
        R: Recoverable,
        R::Error: From<Error>,
    {
        let mut request = recoverable;
        let mut attempt = 1;

        loop {
            let error = match self.send(&request, attempt).await {
                Ok(body) => return self.decode(&request, &body),
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                method = %request.method(),
                url = %request.url(),
                "Request failed"
            );

            let Some(delay) = self.recovery_delay(&request, &error, attempt) else {
                return Err(R::Error::from(error));
            };

            tracing::info!(
                delay_ms = delay.as_millis(),
                attempt = attempt,
                recovery_attempt = request.recovery_attempt_count() + 1,
                "Recovering request after delay"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            request = request.updated_for_next_attempt();
            attempt += 1;
        }
    }

    fn recovery_delay<R: Recoverable>(
        &self,
        request: &R,
        error: &Error,
        attempt: usize,
    ) -> Option<Duration> {
        if !request.can_attempt_recovery() {
            return None;
        }

        self.recovery_strategies
            .iter()
            .find_map(|strategy| match strategy.attempt_recovery(error, attempt) {
                RecoveryDisposition::Retry { after } => Some(after),
                RecoveryDisposition::Fail => None,
            })
    }

    /// Executes a single exchange and returns the body of a 2xx response.
    async fn send<R: Request>(&self, request: &R, attempt: usize) -> Result<Vec<u8>> {
        let start_time = Instant::now();

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut headers = self.default_headers.clone();
        headers.extend(request.headers().clone());
        if !headers.contains_key(CACHE_CONTROL) {
            if let Some(directive) = request.cache_policy().cache_control() {
                headers.insert(CACHE_CONTROL, HeaderValue::from_static(directive));
            }
        }

        let mut builder = self
            .http_client
            .request(request.method().clone(), request.url().clone())
            .headers(headers)
            .timeout(request.timeout());

        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let latency = start_time.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            attempt = attempt,
            "Received HTTP response"
        );

        if !status.is_success() {
            let raw_response = response.text().await.unwrap_or_default();

            if status.is_client_error() {
                tracing::error!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Client error (4xx)"
                );
            } else if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Server error (5xx)"
                );
            }

            return Err(Error::HttpError {
                status,
                raw_response,
                headers,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn decode<R: Request>(
        &self,
        request: &R,
        body: &[u8],
    ) -> std::result::Result<R::Response, R::Error> {
        let result = request.transform(body);
        if result.is_err() {
            tracing::error!(
                url = %request.url(),
                raw_response = %String::from_utf8_lossy(body),
                "Failed to decode response"
            );
        }
        result
    }
}

/// Builder for configuring and creating a [`Backend`].
///
/// # Examples
///
/// ```no_run
/// use hyperspace::Backend;
/// use hyperspace::recovery::RecoverOnRetryable;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), hyperspace::Error> {
/// let backend = Backend::builder()
///     .default_header("Accept", "application/json")?
///     .recovery_strategy(Box::new(RecoverOnRetryable {
///         delay: Duration::from_millis(100),
///     }))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct BackendBuilder {
    http_client: Option<reqwest::Client>,
    default_headers: HeaderMap,
    recovery_strategies: Vec<Box<dyn RecoveryStrategy>>,
    runtime: Option<Handle>,
}

impl BackendBuilder {
    /// Creates a new `BackendBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            http_client: None,
            default_headers: HeaderMap::new(),
            recovery_strategies: Vec::new(),
            runtime: None,
        }
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// Headers set on a request replace default headers of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Uses an existing `reqwest::Client` instead of building a new one.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Appends a recovery strategy.
    ///
    /// Strategies are consulted in the order they were added; the first that asks
    /// for a retry wins. Without strategies, recoverable requests are never
    /// re-issued.
    pub fn recovery_strategy(mut self, strategy: Box<dyn RecoveryStrategy>) -> Self {
        self.recovery_strategies.push(strategy);
        self
    }

    /// Sets the tokio runtime the backend spawns exchanges on.
    ///
    /// Defaults to the runtime `build` is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Builds the configured `Backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if no tokio runtime is available or the HTTP client cannot
    /// be built.
    pub fn build(self) -> Result<Backend> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                Error::ConfigurationError(format!("A tokio runtime is required: {}", e))
            })?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        Ok(Backend {
            inner: Arc::new(BackendInner {
                http_client,
                default_headers: self.default_headers,
                recovery_strategies: self.recovery_strategies,
                runtime,
            }),
        })
    }
}

impl Default for BackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}
