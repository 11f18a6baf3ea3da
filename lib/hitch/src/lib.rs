//! Fluent HTTP requests that report errors once, at send time.
//!
//! Every builder step either updates the request or records the first error
//! it meets; [`RequestBuilder::send`](hitch_core::RequestBuilder::send) then
//! returns that error or runs the request. Responses read their body lazily
//! and cache it, so the bytes, text and JSON views can be mixed freely.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//!
//! let mut response = hitch::post("https://api.example.com/users")
//!     .header("Accept", "application/json")
//!     .timeout(Duration::from_secs(5))
//!     .json(&serde_json::json!({ "name": "alice" }))
//!     .send()?;
//!
//! response.raise_for_status()?;
//! let user = response.json()?;
//! ```
//!
//! The free functions use a process-wide [`Client`]. Build your own with
//! [`Client::builder`] to change the default timeouts, and use its
//! [`TransportExt`] methods the same way.

mod client;
mod config;
mod connector;
pub mod extension;
pub mod prelude;

use std::sync::LazyLock;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};

// Re-export core types
pub use hitch_core::{
    BodySource, ContentType, Error, Form, Method, Part, Request, Response, ResponseBody, Result,
    StatusCode, Transport, TransportExt, from_json, to_form, to_json,
};

/// Request builder bound to the blocking [`Client`].
pub type RequestBuilder = hitch_core::RequestBuilder<Client>;

static SHARED: LazyLock<Client> = LazyLock::new(Client::new);

fn shared() -> &'static Client {
    &SHARED
}

/// Start a request with an arbitrary method on the shared client.
#[must_use]
pub fn request(method: Method, url: impl Into<String>) -> RequestBuilder {
    shared().request(method, url)
}

/// Start a GET request on the shared client.
#[must_use]
pub fn get(url: impl Into<String>) -> RequestBuilder {
    shared().get(url)
}

/// Start a POST request on the shared client.
#[must_use]
pub fn post(url: impl Into<String>) -> RequestBuilder {
    shared().post(url)
}

/// Start a PUT request on the shared client.
#[must_use]
pub fn put(url: impl Into<String>) -> RequestBuilder {
    shared().put(url)
}

/// Start a DELETE request on the shared client.
#[must_use]
pub fn delete(url: impl Into<String>) -> RequestBuilder {
    shared().delete(url)
}

/// Start a PATCH request on the shared client.
#[must_use]
pub fn patch(url: impl Into<String>) -> RequestBuilder {
    shared().patch(url)
}

/// Start a HEAD request on the shared client.
#[must_use]
pub fn head(url: impl Into<String>) -> RequestBuilder {
    shared().head(url)
}

/// Start an OPTIONS request on the shared client.
#[must_use]
pub fn options(url: impl Into<String>) -> RequestBuilder {
    shared().options(url)
}
