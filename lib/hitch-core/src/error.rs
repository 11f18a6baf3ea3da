//! Error types for hitch.
//!
//! Errors fall into five families:
//! - serialization ([`Error::JsonSerialization`]), captured by the builder and
//!   only surfaced by `send()`
//! - construction ([`Error::InvalidUrl`], [`Error::InvalidRequest`], [`Error::Io`])
//! - network ([`Error::Connection`], [`Error::Tls`], [`Error::Timeout`])
//! - decoding ([`Error::JsonDeserialization`])
//! - status ([`Error::Http`]), only produced by `Response::raise_for_status`

use derive_more::{Display, Error, From};

/// Main error type for hitch operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// HTTP-level errors (4xx and 5xx status codes).
    #[display("HTTP error {status}: {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Response body, if it was already read.
        #[error(not(source))]
        body: Option<bytes::Bytes>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request deadline elapsed.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// Reading a request body source failed.
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// The response body was lost by an earlier failed read.
    #[display("response body already consumed")]
    #[from(skip)]
    BodyConsumed,
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Create an HTTP error with body.
    #[must_use]
    pub fn http_with_body(status: u16, message: impl Into<String>, body: bytes::Bytes) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: Some(body),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the request could not be built (bad URL, header or body source).
    #[must_use]
    pub const fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::InvalidRequest(_) | Self::Io(_)
        )
    }

    /// Returns `true` if a request body could not be serialized.
    #[must_use]
    pub const fn is_serialization(&self) -> bool {
        matches!(self, Self::JsonSerialization(_))
    }

    /// Returns `true` if a response body could not be decoded.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::JsonDeserialization { .. })
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns `true` if this is a 404 Not Found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns the response body if this is an HTTP error with a body.
    #[must_use]
    pub fn body(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Try to decode the HTTP error body as JSON.
    ///
    /// Returns `Some(Ok(value))` if the error has a body and it deserializes successfully,
    /// `Some(Err(error))` if the body exists but deserialization fails,
    /// or `None` if there is no body or this is not an HTTP error.
    ///
    /// # Example
    ///
    /// ```ignore
    /// #[derive(Debug, Deserialize)]
    /// struct ApiError {
    ///     code: String,
    ///     message: String,
    /// }
    ///
    /// let mut response = hitch::get(url).send()?;
    /// response.bytes()?;
    /// if let Err(e) = response.raise_for_status() {
    ///     if let Some(Ok(api_error)) = e.decode_body::<ApiError>() {
    ///         println!("API error: {} - {}", api_error.code, api_error.message);
    ///     }
    /// }
    /// ```
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }
}
