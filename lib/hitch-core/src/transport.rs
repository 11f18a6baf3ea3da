//! Transport traits.
//!
//! - [`Transport`] - executes one [`Request`] and produces a [`Response`]
//! - [`TransportExt`] - per-method constructors returning a [`RequestBuilder`]
//!
//! Implement [`Transport`] to plug another HTTP stack, or a fake one for tests.

use std::sync::Arc;

use crate::{Method, Request, RequestBuilder, Response, Result};

/// Blocking HTTP executor.
///
/// Implementations resolve the request's timeout and body, perform exactly
/// one exchange, and return the response with its body still unread.
/// Failures are returned as-is: no retry happens at this level.
pub trait Transport {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Invalid URL, header, or unreadable body source
    /// - Network or TLS errors
    /// - Timeouts
    fn execute(&self, request: Request) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request)
    }
}

/// Extension trait for [`Transport`] with one constructor per HTTP method.
///
/// Each constructor clones the transport into a fresh [`RequestBuilder`].
pub trait TransportExt: Transport + Clone {
    /// Start a request with an arbitrary method.
    fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder<Self> {
        RequestBuilder::new(self.clone(), method, url)
    }

    /// Start a GET request.
    fn get(&self, url: impl Into<String>) -> RequestBuilder<Self> {
        self.request(Method::Get, url)
    }

    /// Start a POST request.
    fn post(&self, url: impl Into<String>) -> RequestBuilder<Self> {
        self.request(Method::Post, url)
    }

    /// Start a PUT request.
    fn put(&self, url: impl Into<String>) -> RequestBuilder<Self> {
        self.request(Method::Put, url)
    }

    /// Start a DELETE request.
    fn delete(&self, url: impl Into<String>) -> RequestBuilder<Self> {
        self.request(Method::Delete, url)
    }

    /// Start a PATCH request.
    fn patch(&self, url: impl Into<String>) -> RequestBuilder<Self> {
        self.request(Method::Patch, url)
    }

    /// Start a HEAD request.
    fn head(&self, url: impl Into<String>) -> RequestBuilder<Self> {
        self.request(Method::Head, url)
    }

    /// Start an OPTIONS request.
    fn options(&self, url: impl Into<String>) -> RequestBuilder<Self> {
        self.request(Method::Options, url)
    }
}

// Blanket implementation for all cloneable transports
impl<T: Transport + Clone> TransportExt for T {}
