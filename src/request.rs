//! Typed requests and their builder.
//!
//! A [`TypedRequest`] bundles everything a transport needs for one call (method,
//! URL, headers, body, cache policy, timeout) together with the transform that turns
//! the raw response bytes into a typed `Result`. Transports only see the
//! [`Request`] trait, so requests built with different decoding strategies flow
//! through the same execution path.

use crate::config::{CachePolicy, RequestDefaults};
use crate::decoding::{self, DecodableContainer, DecoderConfig};
use crate::{Error, Result};
use http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

type Transform<T, E> = Arc<dyn Fn(&[u8]) -> std::result::Result<T, E> + Send + Sync>;

/// The transport-facing shape of a request.
///
/// Every constructor of [`TypedRequest`] produces this same shape; a
/// [`BackendService`](crate::backend::BackendService) needs nothing else to
/// perform the call and interpret its response.
pub trait Request {
    /// The decoded success type.
    type Response;

    /// The failure type produced by the transform and by the transport.
    type Error;

    /// The HTTP method.
    fn method(&self) -> &Method;

    /// The absolute request URL.
    fn url(&self) -> &Url;

    /// The request headers. Keys are unique.
    fn headers(&self) -> &HeaderMap;

    /// The request body, if any.
    fn body(&self) -> Option<&[u8]>;

    /// The cache policy the transport should honour.
    fn cache_policy(&self) -> CachePolicy;

    /// The timeout for a single exchange.
    fn timeout(&self) -> Duration;

    /// Interprets the raw response body.
    fn transform(&self, raw: &[u8]) -> std::result::Result<Self::Response, Self::Error>;
}

/// An immutable description of one API call plus its decoding strategy.
///
/// # Type Parameters
///
/// * `T` - The decoded success type
/// * `E` - The failure type, [`Error`] unless re-targeted with [`TypedRequest::map_err`]
///
/// # Examples
///
/// ```
/// use hyperspace::{Request, TypedRequest};
/// use http::Method;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # fn main() -> Result<(), hyperspace::Error> {
/// let request = TypedRequest::builder(Method::GET, "https://api.example.com/users/1")?
///     .header("Accept", "application/json")?
///     .decode_root_key::<User>("data");
///
/// let user = request.transform(br#"{"data": {"id": 1, "name": "x"}}"#)?;
/// assert_eq!(user, User { id: 1, name: "x".to_string() });
/// # Ok(())
/// # }
/// ```
pub struct TypedRequest<T, E = Error> {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    cache_policy: CachePolicy,
    timeout: Duration,
    transform: Transform<T, E>,
}

impl TypedRequest<(), Error> {
    /// Starts building a request for `method` and `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or not an `http`/`https` URL.
    pub fn builder(method: Method, url: impl AsRef<str>) -> Result<RequestBuilder> {
        RequestBuilder::new(method, url)
    }
}

impl<T, E> TypedRequest<T, E>
where
    T: 'static,
    E: 'static,
{
    /// Re-targets the failure type of the transform.
    ///
    /// Transports produce their own failures through `From<Error>`, so the new error
    /// type usually needs that conversion as well.
    pub fn map_err<E2, F>(self, f: F) -> TypedRequest<T, E2>
    where
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        let transform = self.transform;
        TypedRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            cache_policy: self.cache_policy,
            timeout: self.timeout,
            transform: Arc::new(move |raw: &[u8]| transform(raw).map_err(&f)),
        }
    }

    /// Maps the decoded value to a different type.
    pub fn map<U, F>(self, f: F) -> TypedRequest<U, E>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let transform = self.transform;
        TypedRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            cache_policy: self.cache_policy,
            timeout: self.timeout,
            transform: Arc::new(move |raw: &[u8]| transform(raw).map(&f)),
        }
    }
}

impl<T, E> Request for TypedRequest<T, E> {
    type Response = T;
    type Error = E;

    fn method(&self) -> &Method {
        &self.method
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transform(&self, raw: &[u8]) -> std::result::Result<T, E> {
        (self.transform)(raw)
    }
}

impl<T, E> Clone for TypedRequest<T, E> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            cache_policy: self.cache_policy,
            timeout: self.timeout,
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<T, E> fmt::Debug for TypedRequest<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("cache_policy", &self.cache_policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TypedRequest`].
///
/// Setters validate eagerly so malformed parameters are rejected while building;
/// decoding failures only surface when the finished request is executed.
///
/// The terminal methods pick the decoding strategy:
///
/// - [`transform`](RequestBuilder::transform) takes any raw transform
/// - [`decode`](RequestBuilder::decode) decodes the body directly
/// - [`decode_container`](RequestBuilder::decode_container) unwraps a [`DecodableContainer`]
/// - [`decode_root_key`](RequestBuilder::decode_root_key) extracts one top-level key
///
/// # Examples
///
/// ```
/// use hyperspace::{CachePolicy, Request, RequestDefaults, TypedRequest};
/// use hyperspace::decoding::DataContainer;
/// use http::Method;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), hyperspace::Error> {
/// let defaults = RequestDefaults::builder()
///     .timeout(Duration::from_secs(10))
///     .build();
///
/// let request = TypedRequest::builder(Method::POST, "https://api.example.com/search")?
///     .defaults(&defaults)
///     .cache_policy(CachePolicy::ReloadIgnoringCacheData)
///     .json_body(&serde_json::json!({ "query": "rust" }))?
///     .decode_container::<DataContainer<Vec<String>>>();
///
/// assert_eq!(request.timeout(), Duration::from_secs(10));
/// assert_eq!(request.headers()["content-type"], "application/json");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    defaults: RequestDefaults,
    cache_policy: Option<CachePolicy>,
    timeout: Option<Duration>,
    decoder: DecoderConfig,
}

impl RequestBuilder {
    /// Creates a builder for `method` and `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConstructionError`] if the URL does not parse or is not an
    /// `http`/`https` URL.
    pub fn new(method: Method, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())
            .map_err(|e| Error::ConstructionError(format!("Invalid URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::ConstructionError(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            defaults: RequestDefaults::default(),
            cache_policy: None,
            timeout: None,
            decoder: DecoderConfig::default(),
        })
    }

    /// Sets a header, replacing any previous value for the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConstructionError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConstructionError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets multiple headers.
    ///
    /// # Errors
    ///
    /// Returns an error on the first invalid header name or value.
    pub fn headers<I, K, V>(self, headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        headers
            .into_iter()
            .try_fold(self, |builder, (name, value)| builder.header(name, value))
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `body` as JSON and uses it as the request body.
    ///
    /// Sets `Content-Type: application/json` unless a content type was already set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if the body cannot be serialized.
    pub fn json_body<B>(mut self, body: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let bytes =
            serde_json::to_vec(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        self.body = Some(bytes);
        Ok(self)
    }

    /// Sets the defaults used for any field not set explicitly on this builder.
    pub fn defaults(mut self, defaults: &RequestDefaults) -> Self {
        self.defaults = defaults.clone();
        self
    }

    /// Overrides the cache policy.
    pub fn cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = Some(cache_policy);
        self
    }

    /// Overrides the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the decoder configuration used by the `decode*` terminal methods.
    pub fn decoder(mut self, config: DecoderConfig) -> Self {
        self.decoder = config;
        self
    }

    /// Finishes the request with an arbitrary transform.
    pub fn transform<T, E, F>(self, transform: F) -> TypedRequest<T, E>
    where
        F: Fn(&[u8]) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        TypedRequest {
            cache_policy: self.cache_policy.unwrap_or(self.defaults.cache_policy),
            timeout: self.timeout.unwrap_or(self.defaults.timeout),
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            transform: Arc::new(transform),
        }
    }

    /// Finishes the request, decoding the body directly into `T`.
    pub fn decode<T>(self) -> TypedRequest<T>
    where
        T: DeserializeOwned + 'static,
    {
        let config = self.decoder.clone();
        self.transform(move |raw| decoding::decode_direct::<T>(raw, &config))
    }

    /// Finishes the request, decoding the body as container `C` and returning its element.
    pub fn decode_container<C>(self) -> TypedRequest<C::Element>
    where
        C: DecodableContainer + 'static,
    {
        let config = self.decoder.clone();
        self.transform(move |raw| decoding::decode_container::<C>(raw, &config))
    }

    /// Finishes the request, decoding the value under `root_key` into `T`.
    pub fn decode_root_key<T>(self, root_key: impl Into<String>) -> TypedRequest<T>
    where
        T: DeserializeOwned + 'static,
    {
        let config = self.decoder.clone();
        let root_key = root_key.into();
        self.transform(move |raw| decoding::decode_root_key::<T>(raw, &root_key, &config))
    }
}
