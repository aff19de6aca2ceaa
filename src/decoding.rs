//! Decoding strategies that turn raw response bytes into typed values.
//!
//! Three strategies are available, each a pure function of its input bytes and a
//! [`DecoderConfig`]:
//!
//! - [`decode_direct`] decodes the bytes straight into the target type.
//! - [`decode_container`] decodes an API envelope implementing
//!   [`DecodableContainer`] and returns the single element it wraps.
//! - [`decode_root_key`] decodes the bytes into a JSON object, picks the value
//!   stored under one key and decodes that value into the target type.
//!
//! Failures are always returned as [`Error::DecodingFailed`] or
//! [`Error::ValueNotFound`]; nothing panics.
//!
//! # Examples
//!
//! ```
//! use hyperspace::decoding::{decode_container, decode_root_key, DataContainer, DecoderConfig};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, PartialEq)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let config = DecoderConfig::default();
//! let body = br#"{"data": {"id": 1, "name": "x"}}"#;
//!
//! let from_key: User = decode_root_key(body, "data", &config).unwrap();
//! let from_container = decode_container::<DataContainer<User>>(body, &config).unwrap();
//!
//! assert_eq!(from_key, from_container);
//! ```

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::value::{to_raw_value, RawValue};
use std::collections::{BTreeMap, HashMap};

/// Path reported by [`Error::ValueNotFound`] when the document root was searched.
pub const ROOT_PATH: &str = "$";

/// How object keys in the payload are mapped before decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyDecoding {
    /// Use the keys exactly as they appear in the payload.
    #[default]
    UseDefaultKeys,

    /// Rewrite `snake_case` keys to `camelCase` before decoding.
    ///
    /// Leading and trailing underscores are preserved, the first word is
    /// lowercased and every following word is capitalised: `user_id` becomes
    /// `userId`, `_private_key_` becomes `_privateKey_`.
    ConvertFromSnakeCase,
}

/// How an empty response body is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyBody {
    /// An empty body is a decoding failure.
    #[default]
    Reject,

    /// An empty (or whitespace-only) body decodes as JSON `null`.
    ///
    /// Useful for `204 No Content` endpoints decoded into `()` or `Option<T>`.
    Null,
}

/// Configuration shared by all decoding strategies.
///
/// # Examples
///
/// ```
/// use hyperspace::decoding::{decode_direct, DecoderConfig, KeyDecoding};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Account {
///     account_id: u32,
/// }
///
/// let config = DecoderConfig::default().with_key_decoding(KeyDecoding::ConvertFromSnakeCase);
/// let account: Account = decode_direct(br#"{"account_id": 7}"#, &config).unwrap();
/// assert_eq!(account.account_id, 7);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Key mapping applied to every object in the payload.
    pub key_decoding: KeyDecoding,

    /// Handling of empty response bodies.
    pub empty_body: EmptyBody,
}

impl DecoderConfig {
    /// Sets the key decoding strategy.
    pub fn with_key_decoding(mut self, key_decoding: KeyDecoding) -> Self {
        self.key_decoding = key_decoding;
        self
    }

    /// Sets the empty body handling.
    pub fn with_empty_body(mut self, empty_body: EmptyBody) -> Self {
        self.empty_body = empty_body;
        self
    }

    fn prepare<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        match self.empty_body {
            EmptyBody::Null if bytes.iter().all(u8::is_ascii_whitespace) => &b"null"[..],
            _ => bytes,
        }
    }
}

/// A decodable envelope that wraps exactly one element.
///
/// Implement this for API envelopes such as `{ "data": {...} }` so endpoints can be
/// decoded with [`decode_container`] without unwrapping the envelope by hand.
/// Decoding the container always yields its element, so a container that decodes
/// successfully implies a valid element.
///
/// # Examples
///
/// ```
/// use hyperspace::decoding::{decode_container, DecodableContainer, DecoderConfig};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Results {
///     results: Vec<u32>,
/// }
///
/// impl DecodableContainer for Results {
///     type Element = Vec<u32>;
///
///     fn element(&self) -> &Vec<u32> {
///         &self.results
///     }
///
///     fn into_element(self) -> Vec<u32> {
///         self.results
///     }
/// }
///
/// let numbers = decode_container::<Results>(br#"{"results": [1, 2]}"#, &DecoderConfig::default());
/// assert_eq!(numbers.unwrap(), vec![1, 2]);
/// ```
pub trait DecodableContainer: DeserializeOwned {
    /// The type of the wrapped element.
    type Element: DeserializeOwned;

    /// Returns a reference to the wrapped element.
    fn element(&self) -> &Self::Element;

    /// Consumes the container and returns the wrapped element.
    fn into_element(self) -> Self::Element;
}

/// The common `{ "data": ... }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataContainer<T> {
    /// The wrapped element.
    pub data: T,
}

impl<T: DeserializeOwned> DecodableContainer for DataContainer<T> {
    type Element = T;

    fn element(&self) -> &T {
        &self.data
    }

    fn into_element(self) -> T {
        self.data
    }
}

/// Decodes `bytes` directly into `T`.
///
/// # Errors
///
/// Returns [`Error::DecodingFailed`] if the bytes are not valid JSON or do not
/// match the schema of `T`.
pub fn decode_direct<T>(bytes: &[u8], config: &DecoderConfig) -> Result<T>
where
    T: DeserializeOwned,
{
    decode_slice(config.prepare(bytes), config).map_err(|e| decoding_failed(bytes, &e))
}

/// Decodes `bytes` into the container `C` and returns its element.
///
/// # Errors
///
/// Returns [`Error::DecodingFailed`] if the envelope does not parse.
pub fn decode_container<C>(bytes: &[u8], config: &DecoderConfig) -> Result<C::Element>
where
    C: DecodableContainer,
{
    decode_direct::<C>(bytes, config).map(C::into_element)
}

/// Decodes the value stored under `root_key` of the top-level JSON object.
///
/// The object is decoded into a map of raw values first; the text found under the
/// key is then decoded into `T` exactly as it appears in the payload. Only the key
/// as it appears in the payload is matched; key conversion from `config` applies
/// to the extracted value.
///
/// # Errors
///
/// Returns [`Error::DecodingFailed`] if the bytes are not a JSON object or the
/// value does not match `T`, and [`Error::ValueNotFound`] if the key is absent.
/// Decoding failures always carry the full response body.
pub fn decode_root_key<T>(bytes: &[u8], root_key: &str, config: &DecoderConfig) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut container: HashMap<String, Box<RawValue>> =
        serde_json::from_slice(config.prepare(bytes)).map_err(|e| decoding_failed(bytes, &e))?;

    let element = container
        .remove(root_key)
        .ok_or_else(|| Error::ValueNotFound {
            key: root_key.to_string(),
            path: ROOT_PATH.to_string(),
        })?;

    decode_slice(element.get().as_bytes(), config).map_err(|e| decoding_failed(bytes, &e))
}

fn decode_slice<T>(input: &[u8], config: &DecoderConfig) -> serde_json::Result<T>
where
    T: DeserializeOwned,
{
    match config.key_decoding {
        KeyDecoding::UseDefaultKeys => serde_json::from_slice(input),
        KeyDecoding::ConvertFromSnakeCase => {
            let raw: Box<RawValue> = serde_json::from_slice(input)?;
            let converted = convert_keys(&raw)?;
            serde_json::from_str(converted.get())
        }
    }
}

fn decoding_failed(bytes: &[u8], err: &serde_json::Error) -> Error {
    Error::DecodingFailed {
        raw_response: String::from_utf8_lossy(bytes).into_owned(),
        serde_error: err.to_string(),
    }
}

/// Rewrites object keys recursively. Scalars are carried over as raw text.
fn convert_keys(raw: &RawValue) -> serde_json::Result<Box<RawValue>> {
    match raw.get().trim_start().as_bytes().first() {
        Some(b'{') => {
            let object: BTreeMap<String, Box<RawValue>> = serde_json::from_str(raw.get())?;
            let converted = object
                .into_iter()
                .map(|(key, value)| Ok((convert_from_snake_case(&key), convert_keys(&value)?)))
                .collect::<serde_json::Result<BTreeMap<_, _>>>()?;
            to_raw_value(&converted)
        }
        Some(b'[') => {
            let items: Vec<Box<RawValue>> = serde_json::from_str(raw.get())?;
            let converted = items
                .iter()
                .map(|item| convert_keys(item))
                .collect::<serde_json::Result<Vec<_>>>()?;
            to_raw_value(&converted)
        }
        _ => Ok(raw.to_owned()),
    }
}

fn convert_from_snake_case(key: &str) -> String {
    let trimmed = key.trim_matches('_');
    if !trimmed.contains('_') {
        return key.to_string();
    }

    let start = key.len() - key.trim_start_matches('_').len();
    let end = start + trimmed.len();

    let mut converted = String::with_capacity(key.len());
    converted.push_str(&key[..start]);
    for (index, word) in trimmed.split('_').filter(|w| !w.is_empty()).enumerate() {
        if index == 0 {
            converted.push_str(&word.to_lowercase());
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            converted.extend(first.to_uppercase());
            converted.push_str(&chars.as_str().to_lowercase());
        }
    }
    converted.push_str(&key[end..]);
    converted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Contained {
        id: u32,
    }

    #[derive(Debug, Deserialize)]
    struct ElementContainer {
        element: Contained,
    }

    impl DecodableContainer for ElementContainer {
        type Element = Contained;

        fn element(&self) -> &Contained {
            &self.element
        }

        fn into_element(self) -> Contained {
            self.element
        }
    }

    #[test]
    fn test_direct_matches_reference_decoder() {
        let body = br#"{"id": 3, "name": "direct"}"#;
        let expected: Item = serde_json::from_slice(body).unwrap();

        let decoded: Item = decode_direct(body, &DecoderConfig::default()).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_root_key_success() {
        let body = br#"{"data": {"id": 1, "name": "x"}}"#;

        let decoded: Item = decode_root_key(body, "data", &DecoderConfig::default()).unwrap();
        assert_eq!(
            decoded,
            Item {
                id: 1,
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn test_root_key_missing() {
        let result = decode_root_key::<Item>(br#"{"other": {}}"#, "data", &DecoderConfig::default());

        match result {
            Err(Error::ValueNotFound { key, path }) => {
                assert_eq!(key, "data");
                assert_eq!(path, ROOT_PATH);
            }
            other => panic!("Expected ValueNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_root_key_non_object_is_decoding_failure() {
        let result = decode_root_key::<Item>(b"[1, 2, 3]", "data", &DecoderConfig::default());
        assert!(matches!(result, Err(Error::DecodingFailed { .. })));
    }

    #[test]
    fn test_root_key_value_mismatch() {
        let result =
            decode_root_key::<Item>(br#"{"data": {"id": "one"}}"#, "data", &DecoderConfig::default());

        match result {
            Err(Error::DecodingFailed { raw_response, .. }) => {
                assert_eq!(raw_response, r#"{"data": {"id": "one"}}"#);
            }
            other => panic!("Expected DecodingFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_root_key_keeps_integers_beyond_u64() {
        let config = DecoderConfig::default();
        let direct: u128 = decode_direct(b"18446744073709551616", &config).unwrap();
        let from_key: u128 =
            decode_root_key(br#"{"data": 18446744073709551616}"#, "data", &config).unwrap();

        assert_eq!(from_key, direct);
        assert_eq!(from_key, 18_446_744_073_709_551_616);
    }

    #[test]
    fn test_root_key_matches_reference_decode_of_extracted_text() {
        let body = br#"{"data": [0.1, 2.5e-308, -170141183460469231731687303715884105728]}"#;
        let expected: (f64, f64, i128) =
            serde_json::from_slice(b"[0.1, 2.5e-308, -170141183460469231731687303715884105728]")
                .unwrap();

        let from_key: (f64, f64, i128) =
            decode_root_key(body, "data", &DecoderConfig::default()).unwrap();

        assert_eq!(from_key, expected);
        assert_eq!(from_key.2, i128::MIN);
    }

    #[test]
    fn test_snake_case_keeps_integers_beyond_u64() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Ledger {
            total_cents: u128,
        }

        let config = DecoderConfig::default().with_key_decoding(KeyDecoding::ConvertFromSnakeCase);
        let ledger: Ledger =
            decode_direct(br#"{"total_cents": 340282366920938463463374607431768211455}"#, &config)
                .unwrap();

        assert_eq!(ledger.total_cents, u128::MAX);
    }

    #[test]
    fn test_container_equals_direct_element_decode() {
        let config = DecoderConfig::default();
        let from_container =
            decode_container::<ElementContainer>(br#"{"element": {"id": 2}}"#, &config).unwrap();
        let direct: Contained = decode_direct(br#"{"id": 2}"#, &config).unwrap();

        assert_eq!(from_container, direct);
    }

    #[test]
    fn test_container_element_accessor() {
        let container: ElementContainer =
            decode_direct(br#"{"element": {"id": 9}}"#, &DecoderConfig::default()).unwrap();
        assert_eq!(container.element().id, 9);
    }

    #[test]
    fn test_invalid_json_fails_for_every_strategy() {
        let config = DecoderConfig::default();
        let body = b"{not json";

        assert!(matches!(
            decode_direct::<Item>(body, &config),
            Err(Error::DecodingFailed { .. })
        ));
        assert!(matches!(
            decode_container::<ElementContainer>(body, &config),
            Err(Error::DecodingFailed { .. })
        ));
        assert!(matches!(
            decode_root_key::<Item>(body, "data", &config),
            Err(Error::DecodingFailed { .. })
        ));
    }

    #[test]
    fn test_empty_body_handling() {
        let strict = DecoderConfig::default();
        let lenient = DecoderConfig::default().with_empty_body(EmptyBody::Null);

        assert!(decode_direct::<()>(b"", &strict).is_err());
        assert!(decode_direct::<()>(b"", &lenient).is_ok());
        assert_eq!(decode_direct::<Option<u32>>(b" \n", &lenient).unwrap(), None);
    }

    #[test]
    fn test_snake_case_conversion() {
        assert_eq!(convert_from_snake_case("user_id"), "userId");
        assert_eq!(convert_from_snake_case("_private_key_"), "_privateKey_");
        assert_eq!(convert_from_snake_case("one__two"), "oneTwo");
        assert_eq!(convert_from_snake_case("ALL_CAPS"), "allCaps");
        assert_eq!(convert_from_snake_case("plain"), "plain");
        assert_eq!(convert_from_snake_case("__"), "__");
        assert_eq!(convert_from_snake_case(""), "");
    }

    #[test]
    fn test_snake_case_applies_to_nested_values() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Line {
            unit_price: u32,
        }

        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Order {
            order_lines: Vec<Line>,
        }

        let config = DecoderConfig::default().with_key_decoding(KeyDecoding::ConvertFromSnakeCase);
        let order: Order = decode_root_key(
            br#"{"the_order": {"order_lines": [{"unit_price": 5}]}}"#,
            "the_order",
            &config,
        )
        .unwrap();

        assert_eq!(order.order_lines, vec![Line { unit_price: 5 }]);
    }
}
