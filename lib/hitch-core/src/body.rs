//! Body serialization utilities.

use bytes::Bytes;

use crate::Result;

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use hitch_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Percent-encode key/value pairs as an `application/x-www-form-urlencoded` body.
///
/// Pairs are emitted in iteration order, not sorted by key, and repeated
/// keys are kept.
///
/// # Example
///
/// ```
/// use hitch_core::to_form;
///
/// let bytes = to_form([("username", "alice"), ("greeting", "hello world")]);
/// assert_eq!(bytes.as_ref(), b"username=alice&greeting=hello+world");
/// ```
pub fn to_form<I, K, V>(pairs: I) -> Bytes
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Bytes::from(encoded.into_bytes())
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Uses `serde_path_to_error` to provide detailed error messages that include
/// the exact path to the field that failed to deserialize.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
///
/// # Example
///
/// ```
/// use hitch_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let bytes = br#"{"name":"Alice"}"#;
/// let user: User = from_json(bytes).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })?;
    // Reject trailing garbage such as `{"a":1} junk`.
    deserializer
        .end()
        .map_err(|e| crate::Error::json_deserialization(".", e.to_string()))?;
    Ok(value)
}
