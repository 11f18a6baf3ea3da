//! Blocking HTTP client built on hyper-util.
//!
//! [`Client`] owns a hyper-util client and a current-thread tokio runtime used
//! to drive it. [`Transport::execute`] blocks the calling thread until the
//! response head arrives; the body stays on the wire until the caller reads it
//! through the returned [`Response`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client as LegacyClient, connect::HttpConnector},
    rt::TokioExecutor,
};
use tokio::runtime::Runtime;
use tokio::time::Instant;
use tracing::{debug, debug_span, trace};

use crate::{
    BodySource, Error, Method, Request, Response, ResponseBody, Result, Transport,
    config::{ClientConfig, ClientConfigBuilder},
    connector::https_connector,
};

type HyperClient = LegacyClient<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// State shared by a [`Client`], its clones, and the unread bodies it returned.
struct Inner {
    hyper: HyperClient,
    runtime: OnceLock<Runtime>,
    config: ClientConfig,
}

impl Inner {
    fn runtime(&self) -> Result<&Runtime> {
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(self.runtime.get_or_init(|| runtime))
    }

    /// Run `future` to completion on the client runtime, bounded by `deadline`.
    fn block_on<F: Future>(&self, deadline: Option<Instant>, future: F) -> Result<F::Output> {
        self.runtime()?.block_on(async move {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, future)
                    .await
                    .map_err(|_| Error::Timeout),
                None => Ok(future.await),
            }
        })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // The last owner may be a response dropped inside async code.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Build a hyper request from a hitch request.
///
/// A `Content-Length` set on the builder is rewritten to the size of the
/// materialized body, which may come from a later body source.
fn build_http_request(
    method: Method,
    url: &str,
    headers: &HashMap<String, String>,
    body: Bytes,
) -> Result<http::Request<Full<Bytes>>> {
    let url = url::Url::parse(url)?;

    let mut builder = http::Request::builder()
        .method(http::Method::from(method))
        .uri(url.as_str());

    for (name, value) in headers {
        if name != "content-length" {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    if headers.contains_key("content-length") {
        builder = builder.header(http::header::CONTENT_LENGTH, body.len());
    }

    builder
        .body(Full::new(body))
        .map_err(|e| Error::invalid_request(e.to_string()))
}

/// Extract response headers as a `HashMap`.
///
/// Repeated headers are joined with `", "` in arrival order. Values that are
/// not valid UTF-8 are decoded lossily.
fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
    let mut extracted = HashMap::<String, String>::with_capacity(headers.keys_len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        extracted
            .entry(name.to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    extracted
}

#[allow(clippy::needless_pass_by_value)]
fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
    let msg = err.to_string();

    if err.is_connect() {
        return Error::connection(msg);
    }

    if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
        return Error::tls(msg);
    }

    Error::connection(msg)
}

/// Response body still held by the connection.
struct HyperBody {
    inner: Arc<Inner>,
    body: Incoming,
    deadline: Option<Instant>,
}

impl ResponseBody for HyperBody {
    fn collect(self: Box<Self>) -> Result<Bytes> {
        let Self {
            inner,
            body,
            deadline,
        } = *self;

        let bytes = inner
            .block_on(deadline, body.collect())?
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        trace!(len = bytes.len(), "response body read");
        Ok(bytes)
    }
}

/// Blocking HTTP client with TLS support.
///
/// Cloning is cheap: clones share the connection pool and runtime.
///
/// # Example
///
/// ```ignore
/// use hitch::{Client, TransportExt};
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(5))
///     .build();
///
/// let mut response = client.get("https://example.com").send()?;
/// println!("{}", response.text()?);
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration.
    ///
    /// The runtime is only started by the first request.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let hyper = LegacyClient::builder(TokioExecutor::new())
            .build(https_connector(config.connect_timeout));

        Self {
            inner: Arc::new(Inner {
                hyper,
                runtime: OnceLock::new(),
                config,
            }),
        }
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Timeout used for `request`: its own, or the configured default.
    ///
    /// `None` means no deadline.
    fn effective_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        let timeout = timeout.unwrap_or(self.inner.config.timeout);
        (!timeout.is_zero()).then_some(timeout)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for Client {
    fn execute(&self, request: Request) -> Result<Response> {
        let (method, url, headers, timeout, body) = request.into_parts();
        let _span = debug_span!("http_request", %method, %url).entered();

        let body = body
            .map(BodySource::into_bytes)
            .transpose()?
            .unwrap_or_default();
        let http_request = build_http_request(method, &url, &headers, body)?;

        let timeout = self.effective_timeout(timeout);
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        debug!(?timeout, "sending request");
        let start = std::time::Instant::now();

        let hyper = &self.inner.hyper;
        let response = self
            .inner
            .block_on(deadline, async move { hyper.request(http_request).await })?
            .map_err(map_hyper_error)?;

        let status = response.status().as_u16();
        debug!(
            status,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "received response"
        );

        let headers = extract_headers(response.headers());
        let body = HyperBody {
            inner: Arc::clone(&self.inner),
            body: response.into_body(),
            deadline,
        };

        Ok(Response::new(status, headers, body))
    }
}

/// Builder for [`Client`].
///
/// # Example
///
/// ```ignore
/// use hitch::Client;
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(60))
///     .connect_timeout(Duration::from_secs(3))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfigBuilder,
}

impl ClientBuilder {
    /// Set the default request timeout. [`Duration::ZERO`] disables it.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client {
        Client::with_config(self.config.build())
    }
}
