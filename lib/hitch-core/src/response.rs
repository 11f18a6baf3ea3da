//! HTTP response handling.
//!
//! [`Response`] exposes the status and headers right away and reads the body
//! lazily, at most once: the first call to [`Response::bytes`],
//! [`Response::text`] or [`Response::json`] drains the body and every later
//! call reuses the cached bytes.
//!
//! # Example
//!
//! ```ignore
//! let mut response = hitch::get("https://api.example.com/users/1").send()?;
//! response.raise_for_status()?;
//! let user = response.json()?;
//! ```

use std::collections::HashMap;

use bytes::Bytes;

use crate::{Error, Result};

/// A response body that has not been read yet.
///
/// `collect` is called at most once per response.
pub trait ResponseBody: Send {
    /// Read the whole body.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the request deadline elapses.
    fn collect(self: Box<Self>) -> Result<Bytes>;
}

impl ResponseBody for Bytes {
    fn collect(self: Box<Self>) -> Result<Bytes> {
        Ok(*self)
    }
}

enum BodyState {
    Unread(Box<dyn ResponseBody>),
    Cached(Bytes),
    Failed,
}

impl std::fmt::Debug for BodyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unread(_) => f.write_str("Unread"),
            Self::Cached(bytes) => f.debug_tuple("Cached").field(&bytes.len()).finish(),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// HTTP response with status, headers, and a lazily read body.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: BodyState,
}

impl Response {
    /// Creates a new response. Header names are lower-cased.
    #[must_use]
    pub fn new(
        status: u16,
        headers: HashMap<String, String>,
        body: impl ResponseBody + 'static,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            status,
            headers,
            body: BodyState::Unread(Box::new(body)),
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers, keyed by lower-cased name.
    ///
    /// The map holds one value per name; transports join repeated headers
    /// such as `Set-Cookie` with `", "`.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// The body bytes, if they were already read.
    #[must_use]
    pub fn cached_body(&self) -> Option<&Bytes> {
        match &self.body {
            BodyState::Cached(bytes) => Some(bytes),
            BodyState::Unread(_) | BodyState::Failed => None,
        }
    }

    /// The full response body.
    ///
    /// The underlying body is read on the first call only; later calls return
    /// the same bytes.
    ///
    /// # Errors
    ///
    /// Returns the read error on the first call if reading fails, and
    /// [`Error::BodyConsumed`] on any call after such a failure.
    pub fn bytes(&mut self) -> Result<Bytes> {
        if let BodyState::Cached(bytes) = &self.body {
            return Ok(bytes.clone());
        }
        match std::mem::replace(&mut self.body, BodyState::Failed) {
            BodyState::Unread(body) => {
                let bytes = body.collect()?;
                self.body = BodyState::Cached(bytes.clone());
                Ok(bytes)
            }
            BodyState::Cached(_) | BodyState::Failed => Err(Error::BodyConsumed),
        }
    }

    /// The body as text.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read.
    pub fn text(&mut self) -> Result<String> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// The body parsed as a generic JSON value.
    ///
    /// A decode failure does not affect the cached bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read or is not well-formed JSON.
    pub fn json(&mut self) -> Result<serde_json::Value> {
        self.json_as()
    }

    /// The body deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read or deserialization fails;
    /// the error carries the path of the offending field.
    pub fn json_as<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.bytes()?;
        crate::from_json(&bytes)
    }

    /// Turn a 4xx or 5xx status into an [`Error::Http`].
    ///
    /// Never called implicitly. The error carries the body only if it was
    /// already read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] when the status code is in `400..=599`.
    pub fn raise_for_status(&self) -> Result<()> {
        match self.status / 100 {
            4 | 5 => {
                let message = http::StatusCode::from_u16(self.status)
                    .ok()
                    .and_then(|status| status.canonical_reason())
                    .unwrap_or("unknown status");
                Err(Error::Http {
                    status: self.status,
                    message: message.to_string(),
                    body: self.cached_body().cloned(),
                })
            }
            _ => Ok(()),
        }
    }
}
