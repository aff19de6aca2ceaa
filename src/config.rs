//! Request defaults and cache policies.
//!
//! Defaults are an explicit value handed to
//! [`RequestBuilder::defaults`](crate::request::RequestBuilder::defaults) rather than
//! global state, so building a request stays pure.

use std::time::Duration;

/// How a transport should use caches when performing a request.
///
/// The core never caches anything itself; the policy travels with the request and
/// a transport may translate it into a `Cache-Control` request directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CachePolicy {
    /// Follow the caching semantics of the protocol.
    #[default]
    UseProtocolCachePolicy,

    /// Always load from the origin, bypassing cached data.
    ReloadIgnoringCacheData,

    /// Use cached data regardless of age, loading from the origin only on a miss.
    ReturnCacheDataElseLoad,

    /// Use cached data only; never load from the origin.
    ReturnCacheDataDontLoad,
}

impl CachePolicy {
    /// Returns the `Cache-Control` request directive for this policy, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperspace::CachePolicy;
    ///
    /// assert_eq!(CachePolicy::ReloadIgnoringCacheData.cache_control(), Some("no-cache"));
    /// assert_eq!(CachePolicy::UseProtocolCachePolicy.cache_control(), None);
    /// ```
    pub fn cache_control(&self) -> Option<&'static str> {
        match self {
            CachePolicy::UseProtocolCachePolicy => None,
            CachePolicy::ReloadIgnoringCacheData => Some("no-cache"),
            CachePolicy::ReturnCacheDataElseLoad => Some("max-stale"),
            CachePolicy::ReturnCacheDataDontLoad => Some("only-if-cached"),
        }
    }
}

/// Default cache policy and timeout applied to new requests.
///
/// # Examples
///
/// ```
/// use hyperspace::{CachePolicy, RequestDefaults};
/// use std::time::Duration;
///
/// let defaults = RequestDefaults::builder()
///     .timeout(Duration::from_secs(15))
///     .cache_policy(CachePolicy::ReloadIgnoringCacheData)
///     .build();
///
/// assert_eq!(defaults.timeout, Duration::from_secs(15));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    /// Cache policy for requests that do not set their own.
    ///
    /// Defaults to [`CachePolicy::UseProtocolCachePolicy`].
    pub cache_policy: CachePolicy,

    /// Timeout for requests that do not set their own.
    ///
    /// Defaults to 60 seconds.
    pub timeout: Duration,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RequestDefaults {
    /// Creates a new builder for request defaults.
    pub fn builder() -> RequestDefaultsBuilder {
        RequestDefaultsBuilder::default()
    }
}

/// Builder for [`RequestDefaults`].
#[derive(Default)]
pub struct RequestDefaultsBuilder {
    cache_policy: Option<CachePolicy>,
    timeout: Option<Duration>,
}

impl RequestDefaultsBuilder {
    /// Sets the default cache policy.
    pub fn cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = Some(cache_policy);
        self
    }

    /// Sets the default timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `RequestDefaults`.
    pub fn build(self) -> RequestDefaults {
        let default = RequestDefaults::default();
        RequestDefaults {
            cache_policy: self.cache_policy.unwrap_or(default.cache_policy),
            timeout: self.timeout.unwrap_or(default.timeout),
        }
    }
}
