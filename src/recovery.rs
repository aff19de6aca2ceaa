//! Recoverable requests and transport-owned recovery strategies.
//!
//! A request opts into recovery by implementing [`Recoverable`], which tracks how
//! many times it has been re-issued and how many times it may be. Whether a given
//! failure is worth another attempt is decided by the transport through its
//! [`RecoveryStrategy`] list; the request itself never sees the retry policy.

use crate::config::CachePolicy;
use crate::request::{Request, TypedRequest};
use crate::Error;
use http::{HeaderMap, Method};
use std::fmt;
use std::time::Duration;
use url::Url;

/// A request that a transport may re-issue after a failure.
pub trait Recoverable: Request + Sized {
    /// How many times this request has already been re-issued.
    fn recovery_attempt_count(&self) -> usize;

    /// The maximum number of re-issues, or `None` for no limit.
    fn max_recovery_attempts(&self) -> Option<usize>;

    /// Returns the request to send for the next attempt.
    fn updated_for_next_attempt(&self) -> Self;

    /// Returns `true` while the request may still be re-issued.
    fn can_attempt_recovery(&self) -> bool {
        self.max_recovery_attempts()
            .map_or(true, |max| self.recovery_attempt_count() < max)
    }
}

/// A [`TypedRequest`] that may be re-issued a bounded number of times.
///
/// # Examples
///
/// ```
/// use hyperspace::recovery::{Recoverable, RecoverableRequest};
/// use hyperspace::TypedRequest;
/// use http::Method;
///
/// # fn main() -> Result<(), hyperspace::Error> {
/// let request = TypedRequest::builder(Method::GET, "https://api.example.com/feed")?
///     .decode::<serde_json::Value>();
/// let recoverable = RecoverableRequest::new(request, Some(1));
///
/// assert!(recoverable.can_attempt_recovery());
/// let retried = recoverable.updated_for_next_attempt();
/// assert_eq!(retried.recovery_attempt_count(), 1);
/// assert!(!retried.can_attempt_recovery());
/// # Ok(())
/// # }
/// ```
pub struct RecoverableRequest<T, E = Error> {
    request: TypedRequest<T, E>,
    recovery_attempt_count: usize,
    max_recovery_attempts: Option<usize>,
}

impl<T, E> RecoverableRequest<T, E> {
    /// Wraps `request`, allowing at most `max_recovery_attempts` re-issues.
    pub fn new(request: TypedRequest<T, E>, max_recovery_attempts: Option<usize>) -> Self {
        Self {
            request,
            recovery_attempt_count: 0,
            max_recovery_attempts,
        }
    }

    /// Returns the wrapped request.
    pub fn request(&self) -> &TypedRequest<T, E> {
        &self.request
    }

    /// Consumes the wrapper and returns the wrapped request.
    pub fn into_inner(self) -> TypedRequest<T, E> {
        self.request
    }
}

impl<T, E> Request for RecoverableRequest<T, E> {
    type Response = T;
    type Error = E;

    fn method(&self) -> &Method {
        self.request.method()
    }

    fn url(&self) -> &Url {
        self.request.url()
    }

    fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    fn body(&self) -> Option<&[u8]> {
        self.request.body()
    }

    fn cache_policy(&self) -> CachePolicy {
        self.request.cache_policy()
    }

    fn timeout(&self) -> Duration {
        self.request.timeout()
    }

    fn transform(&self, raw: &[u8]) -> Result<T, E> {
        self.request.transform(raw)
    }
}

impl<T, E> Recoverable for RecoverableRequest<T, E> {
    fn recovery_attempt_count(&self) -> usize {
        self.recovery_attempt_count
    }

    fn max_recovery_attempts(&self) -> Option<usize> {
        self.max_recovery_attempts
    }

    fn updated_for_next_attempt(&self) -> Self {
        Self {
            request: self.request.clone(),
            recovery_attempt_count: self.recovery_attempt_count + 1,
            max_recovery_attempts: self.max_recovery_attempts,
        }
    }
}

impl<T, E> fmt::Debug for RecoverableRequest<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoverableRequest")
            .field("request", &self.request)
            .field("recovery_attempt_count", &self.recovery_attempt_count)
            .field("max_recovery_attempts", &self.max_recovery_attempts)
            .finish()
    }
}

/// What a transport should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDisposition {
    /// Re-issue the request after the given delay.
    Retry {
        /// How long to wait before the next attempt.
        after: Duration,
    },

    /// Give up and deliver the failure.
    Fail,
}

/// Transport-owned decision whether a failed recoverable request is re-issued.
///
/// Strategies only see transport failures; decoding failures are deterministic and
/// are delivered without consulting them.
///
/// # Examples
///
/// ```
/// use hyperspace::recovery::{RecoveryDisposition, RecoveryStrategy};
/// use hyperspace::Error;
/// use std::time::Duration;
///
/// struct RetryOnUnauthorized;
///
/// impl RecoveryStrategy for RetryOnUnauthorized {
///     fn attempt_recovery(&self, error: &Error, _attempt: usize) -> RecoveryDisposition {
///         match error.status() {
///             Some(status) if status.as_u16() == 401 => RecoveryDisposition::Retry {
///                 after: Duration::ZERO,
///             },
///             _ => RecoveryDisposition::Fail,
///         }
///     }
/// }
/// ```
pub trait RecoveryStrategy: Send + Sync {
    /// Decides how to proceed after `error` ended attempt number `attempt` (1-indexed).
    fn attempt_recovery(&self, error: &Error, attempt: usize) -> RecoveryDisposition;
}

impl<F> RecoveryStrategy for F
where
    F: Fn(&Error, usize) -> RecoveryDisposition + Send + Sync,
{
    fn attempt_recovery(&self, error: &Error, attempt: usize) -> RecoveryDisposition {
        self(error, attempt)
    }
}

/// Re-issue after a fixed delay whenever [`Error::is_retryable`] holds.
#[derive(Debug, Clone, Copy)]
pub struct RecoverOnRetryable {
    /// The delay before each re-issue.
    pub delay: Duration,
}

impl RecoveryStrategy for RecoverOnRetryable {
    fn attempt_recovery(&self, error: &Error, _attempt: usize) -> RecoveryDisposition {
        if error.is_retryable() {
            RecoveryDisposition::Retry { after: self.delay }
        } else {
            RecoveryDisposition::Fail
        }
    }
}

/// Combine strategies: the first one that asks for a retry wins.
///
/// # Examples
///
/// ```
/// use hyperspace::recovery::{FirstOf, RecoverOnRetryable, RecoveryDisposition};
/// use hyperspace::Error;
/// use std::time::Duration;
///
/// let strategy = FirstOf::new(vec![
///     Box::new(|error: &Error, _attempt: usize| match error {
///         Error::Timeout => RecoveryDisposition::Retry { after: Duration::ZERO },
///         _ => RecoveryDisposition::Fail,
///     }),
///     Box::new(RecoverOnRetryable { delay: Duration::from_millis(250) }),
/// ]);
/// ```
pub struct FirstOf {
    strategies: Vec<Box<dyn RecoveryStrategy>>,
}

impl FirstOf {
    /// Creates a new `FirstOf` from a list of strategies.
    pub fn new(strategies: Vec<Box<dyn RecoveryStrategy>>) -> Self {
        Self { strategies }
    }
}

impl RecoveryStrategy for FirstOf {
    fn attempt_recovery(&self, error: &Error, attempt: usize) -> RecoveryDisposition {
        self.strategies
            .iter()
            .map(|s| s.attempt_recovery(error, attempt))
            .find(|d| matches!(d, RecoveryDisposition::Retry { .. }))
            .unwrap_or(RecoveryDisposition::Fail)
    }
}
