//! HTTP request building.
//!
//! A [`RequestBuilder`] carries either a [`Request`] under construction or the
//! first error met while configuring it. Once an error is captured every
//! further call is a no-op and [`RequestBuilder::send`] returns that error
//! without reaching the [`Transport`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//!
//! let mut response = hitch::post("https://api.example.com/users")
//!     .header("Accept", "application/json")
//!     .timeout(Duration::from_secs(10))
//!     .json(&serde_json::json!({ "name": "alice" }))
//!     .send()?;
//! response.raise_for_status()?;
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use bytes::Bytes;

use crate::{ContentType, Error, Form, Method, Response, Result, Transport};

/// Where the request payload comes from.
///
/// A request has at most one source; setting a new one replaces the previous.
pub enum BodySource {
    /// In-memory bytes.
    Bytes(Bytes),
    /// Any blocking byte stream, drained when the request is executed.
    Reader(Box<dyn Read + Send>),
}

impl BodySource {
    /// Materialize the source into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading a [`BodySource::Reader`] fails.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl std::fmt::Debug for BodySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader(_) => f.debug_tuple("Reader").finish_non_exhaustive(),
        }
    }
}

/// An HTTP request with method, URL, headers, timeout, and optional body.
///
/// The URL is kept as given; it is parsed by the transport when the request
/// is executed.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: String,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    body: Option<BodySource>,
}

impl Request {
    /// Creates a request with no headers, no timeout and no body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
            body: None,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL, unparsed.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request headers, keyed by lower-cased name.
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

    /// Explicit timeout, if one was set.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Request body source.
    #[must_use]
    pub const fn body(&self) -> Option<&BodySource> {
        self.body.as_ref()
    }

    /// Consume into (method, url, headers, timeout, body).
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Method,
        String,
        HashMap<String, String>,
        Option<Duration>,
        Option<BodySource>,
    ) {
        (
            self.method,
            self.url,
            self.headers,
            self.timeout,
            self.body,
        )
    }

    fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let mut name = name.into();
        name.make_ascii_lowercase();
        self.headers.insert(name, value.into());
    }
}

/// Fluent builder for a single [`Request`], executed by a [`Transport`].
///
/// Every configuration method comes in two flavours: a chaining one taking
/// and returning the builder (`header`, `json`, ...) and an in-place one
/// taking `&mut self` (`set_header`, `set_json`, ...) for use inside
/// extensions passed to [`RequestBuilder::with`].
#[derive(Debug)]
pub struct RequestBuilder<T> {
    transport: T,
    state: Result<Request>,
}

impl<T> RequestBuilder<T> {
    /// Creates a builder seeded with a method and URL.
    #[must_use]
    pub fn new(transport: T, method: Method, url: impl Into<String>) -> Self {
        Self {
            transport,
            state: Ok(Request::new(method, url)),
        }
    }

    /// The request under construction, or `None` once an error was deferred.
    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.state.as_ref().ok()
    }

    /// The deferred error, if any.
    #[must_use]
    pub fn deferred_error(&self) -> Option<&Error> {
        self.state.as_ref().err()
    }

    /// Record `error` as the deferred error.
    ///
    /// Only the first error is kept: on an already failed builder this is a no-op.
    pub fn fail(&mut self, error: Error) -> &mut Self {
        if self.state.is_ok() {
            self.state = Err(error);
        }
        self
    }

    /// Sets a header, replacing any previous value for the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if let Ok(request) = &mut self.state {
            request.insert_header(name, value);
        }
        self
    }

    /// Sets the timeout. [`Duration::ZERO`] disables the deadline.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        if let Ok(request) = &mut self.state {
            request.timeout = Some(timeout);
        }
        self
    }

    /// Sets raw bytes as body, with a matching `Content-Length`.
    pub fn set_bytes(&mut self, data: impl Into<Bytes>) -> &mut Self {
        if let Ok(request) = &mut self.state {
            let data = data.into();
            request.insert_header("Content-Length", data.len().to_string());
            request.body = Some(BodySource::Bytes(data));
        }
        self
    }

    /// Serializes `value` as a JSON body.
    ///
    /// A serialization failure becomes the deferred error.
    pub fn set_json<S: serde::Serialize + ?Sized>(&mut self, value: &S) -> &mut Self {
        if self.state.is_err() {
            return self;
        }
        match crate::to_json(value) {
            Ok(data) => self
                .set_header("Content-Type", ContentType::Json.as_str())
                .set_bytes(data),
            Err(error) => self.fail(error),
        }
    }

    /// Sets a byte stream as body. No header is inferred.
    pub fn set_reader(&mut self, reader: impl Read + Send + 'static) -> &mut Self {
        if let Ok(request) = &mut self.state {
            request.body = Some(BodySource::Reader(Box::new(reader)));
        }
        self
    }

    /// Sets an `application/x-www-form-urlencoded` body from key/value pairs.
    pub fn set_form<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if self.state.is_err() {
            return self;
        }
        let encoded = crate::to_form(pairs);
        self.set_header("Content-Type", ContentType::FormUrlEncoded.as_str())
            .set_bytes(encoded)
    }

    /// Sets a pre-built multipart buffer as body.
    ///
    /// `content_type` is used verbatim: it must carry the boundary used in `buffer`.
    pub fn set_multipart(
        &mut self,
        buffer: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> &mut Self {
        if let Ok(request) = &mut self.state {
            request.insert_header("Content-Type", content_type);
            request.body = Some(BodySource::Bytes(buffer.into()));
        }
        self
    }

    /// Chaining form of [`RequestBuilder::set_header`].
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Chaining form of [`RequestBuilder::set_timeout`].
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    /// Chaining form of [`RequestBuilder::set_bytes`].
    #[must_use]
    pub fn bytes(mut self, data: impl Into<Bytes>) -> Self {
        self.set_bytes(data);
        self
    }

    /// Chaining form of [`RequestBuilder::set_json`].
    #[must_use]
    pub fn json<S: serde::Serialize + ?Sized>(mut self, value: &S) -> Self {
        self.set_json(value);
        self
    }

    /// Chaining form of [`RequestBuilder::set_reader`].
    #[must_use]
    pub fn reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.set_reader(reader);
        self
    }

    /// Chaining form of [`RequestBuilder::set_form`].
    #[must_use]
    pub fn form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.set_form(pairs);
        self
    }

    /// Chaining form of [`RequestBuilder::set_multipart`].
    #[must_use]
    pub fn multipart(mut self, buffer: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.set_multipart(buffer, content_type);
        self
    }

    /// Encodes `form` and sets it as multipart body with its boundary content type.
    #[must_use]
    pub fn multipart_form(self, form: Form) -> Self {
        if self.state.is_err() {
            return self;
        }
        let (content_type, body) = form.into_body();
        self.multipart(body, content_type)
    }

    /// Runs `extension` on the builder, unless an error was already deferred.
    ///
    /// The extension runs synchronously, before anything is sent, so its
    /// changes are visible to the calls chained after it. It may call
    /// [`RequestBuilder::fail`] to abort the request.
    #[must_use]
    pub fn with(mut self, extension: impl FnOnce(&mut Self)) -> Self {
        if self.state.is_ok() {
            extension(&mut self);
        }
        self
    }
}

impl<T: Transport> RequestBuilder<T> {
    /// Executes the request.
    ///
    /// # Errors
    ///
    /// Returns the deferred error if one was captured (the transport is not
    /// called), otherwise whatever the transport reports.
    pub fn send(self) -> Result<Response> {
        let request = self.state?;
        self.transport.execute(request)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::io::Cursor;

    use assert2::{check, let_assert};

    use super::*;

    /// Records the executed request and answers with an empty 200.
    #[derive(Debug, Default)]
    struct RecordingTransport {
        calls: Cell<usize>,
        last: RefCell<Option<Request>>,
    }

    impl Transport for RecordingTransport {
        fn execute(&self, request: Request) -> Result<Response> {
            self.calls.set(self.calls.get() + 1);
            self.last.replace(Some(request));
            Ok(Response::new(200, HashMap::new(), Bytes::new()))
        }
    }

    fn builder(
        transport: &RecordingTransport,
        method: Method,
    ) -> RequestBuilder<&RecordingTransport> {
        RequestBuilder::new(transport, method, "https://api.example.com/users")
    }

    /// A value `serde_json` refuses to serialize.
    fn unserializable() -> BTreeMap<Vec<u8>, u8> {
        BTreeMap::from([(vec![1, 2], 3)])
    }

    #[test]
    fn builder_seeds_method_and_url() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Delete);

        let_assert!(Some(request) = builder.request());
        check!(request.method() == Method::Delete);
        check!(request.url() == "https://api.example.com/users");
        check!(request.headers().is_empty());
        check!(request.timeout().is_none());
        check!(request.body().is_none());
    }

    #[test]
    fn header_last_write_wins_case_insensitively() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Get)
            .header("Accept", "text/plain")
            .header("accept", "application/json");

        let_assert!(Some(request) = builder.request());
        check!(request.headers().len() == 1);
        check!(request.header("ACCEPT") == Some("application/json"));
    }

    #[test]
    fn timeout_is_stored_as_given() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Get).timeout(Duration::ZERO);

        let_assert!(Some(request) = builder.request());
        check!(request.timeout() == Some(Duration::ZERO));
    }

    #[test]
    fn bytes_sets_content_length() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Put).bytes(&b"hello"[..]);

        let_assert!(Some(request) = builder.request());
        check!(request.header("Content-Length") == Some("5"));
        let_assert!(Some(BodySource::Bytes(body)) = request.body());
        check!(body.as_ref() == b"hello");
    }

    #[test]
    fn json_sets_content_type_and_exact_length() {
        let transport = RecordingTransport::default();
        let value = serde_json::json!({ "hello": "world", "emoji": "🦀" });
        let expected = serde_json::to_vec(&value).expect("serialize");
        let length = expected.len().to_string();

        let builder = builder(&transport, Method::Post).json(&value);

        let_assert!(Some(request) = builder.request());
        check!(request.header("Content-Type") == Some("application/json"));
        check!(request.header("Content-Length") == Some(length.as_str()));
        let_assert!(Some(BodySource::Bytes(body)) = request.body());
        check!(body.as_ref() == expected.as_slice());
    }

    #[test]
    fn json_failure_is_deferred() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Post).json(&unserializable());

        check!(builder.request().is_none());
        let_assert!(Some(error) = builder.deferred_error());
        check!(error.is_serialization());
    }

    #[test]
    fn first_deferred_error_survives_later_calls() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Post).json(&unserializable());
        let first = builder.deferred_error().map(ToString::to_string);

        let builder = builder
            .header("X-Late", "1")
            .timeout(Duration::from_secs(1))
            .bytes("late")
            .json(&serde_json::json!({ "late": true }))
            .json(&BTreeMap::from([(vec![9_u8], 9_u8)]))
            .form([("a", "b")])
            .reader(Cursor::new(b"late".to_vec()))
            .multipart("late", "multipart/form-data; boundary=x")
            .with(|b| {
                b.fail(Error::invalid_request("from extension"));
            });

        check!(builder.deferred_error().map(ToString::to_string) == first);
        check!(builder.request().is_none());
    }

    #[test]
    fn send_returns_deferred_error_without_transport() {
        let transport = RecordingTransport::default();
        let result = builder(&transport, Method::Post)
            .json(&unserializable())
            .send();

        let_assert!(Err(error) = result);
        check!(error.is_serialization());
        check!(transport.calls.get() == 0);
    }

    #[test]
    fn reader_replaces_previous_body_without_headers() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Post)
            .reader(Cursor::new(b"streamed".to_vec()));

        let_assert!(Some(request) = builder.request());
        check!(request.header("Content-Length").is_none());
        check!(matches!(request.body(), Some(BodySource::Reader(_))));

        let builder = builder.bytes("abc");
        let_assert!(Some(request) = builder.request());
        check!(matches!(request.body(), Some(BodySource::Bytes(_))));
    }

    #[test]
    fn last_body_source_wins() {
        let transport = RecordingTransport::default();
        builder(&transport, Method::Post)
            .json(&serde_json::json!({ "first": 1 }))
            .reader(Cursor::new(b"second".to_vec()))
            .bytes("third")
            .send()
            .expect("send");

        let_assert!(Some(request) = transport.last.take());
        let (_, _, _, _, body) = request.into_parts();
        let_assert!(Some(body) = body);
        check!(body.into_bytes().expect("bytes").as_ref() == b"third");
    }

    #[test]
    fn form_encodes_pairs() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Post)
            .form([("user", "alice smith"), ("lang", "rust&go")]);

        let_assert!(Some(request) = builder.request());
        check!(request.header("Content-Type") == Some("application/x-www-form-urlencoded"));
        check!(request.header("Content-Length") == Some("31"));
        let_assert!(Some(BodySource::Bytes(body)) = request.body());
        check!(body.as_ref() == b"user=alice+smith&lang=rust%26go");
    }

    #[test]
    fn multipart_uses_content_type_verbatim() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Post)
            .multipart("--xyz--\r\n", "multipart/mixed; boundary=xyz");

        let_assert!(Some(request) = builder.request());
        check!(request.header("Content-Type") == Some("multipart/mixed; boundary=xyz"));
        check!(request.header("Content-Length").is_none());
    }

    #[test]
    fn multipart_form_uses_form_boundary() {
        let transport = RecordingTransport::default();
        let form = Form::with_boundary("b0undary").text("name", "hitch");
        let builder = builder(&transport, Method::Post).multipart_form(form);

        let_assert!(Some(request) = builder.request());
        check!(request.header("Content-Type") == Some("multipart/form-data; boundary=b0undary"));
        let_assert!(Some(BodySource::Bytes(body)) = request.body());
        check!(body.starts_with(b"--b0undary\r\n"));
    }

    #[test]
    fn extension_runs_in_order() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport, Method::Get)
            .header("X-Trace", "from-chain")
            .with(|b| {
                b.set_header("X-Trace", "from-extension")
                    .set_timeout(Duration::from_secs(3));
            })
            .header("X-After", "yes");

        let_assert!(Some(request) = builder.request());
        check!(request.header("x-trace") == Some("from-extension"));
        check!(request.header("x-after") == Some("yes"));
        check!(request.timeout() == Some(Duration::from_secs(3)));
    }

    #[test]
    fn extension_can_defer_an_error() {
        let transport = RecordingTransport::default();
        let result = builder(&transport, Method::Get)
            .with(|b| {
                b.fail(Error::invalid_request("missing credentials"));
            })
            .header("X-Ignored", "1")
            .send();

        let_assert!(Err(Error::InvalidRequest(message)) = result);
        check!(message == "missing credentials");
        check!(transport.calls.get() == 0);
    }

    #[test]
    fn extension_skipped_when_errored() {
        let transport = RecordingTransport::default();
        let ran = Cell::new(false);
        let _builder = builder(&transport, Method::Post)
            .json(&unserializable())
            .with(|_| ran.set(true));

        check!(!ran.get());
    }

    #[test]
    fn send_hands_request_to_transport_once() {
        let transport = RecordingTransport::default();
        let response = builder(&transport, Method::Patch)
            .header("X-Id", "42")
            .bytes("patch")
            .send()
            .expect("send");

        check!(response.status() == 200);
        check!(transport.calls.get() == 1);
        let_assert!(Some(request) = transport.last.take());
        check!(request.method() == Method::Patch);
        check!(request.header("x-id") == Some("42"));
    }

    #[test]
    fn body_source_reader_into_bytes() {
        let source = BodySource::Reader(Box::new(Cursor::new(b"from reader".to_vec())));
        check!(source.into_bytes().expect("read").as_ref() == b"from reader");
    }

    #[test]
    fn body_source_reader_error() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
        }

        let source = BodySource::Reader(Box::new(Broken));
        let_assert!(Err(error) = source.into_bytes());
        check!(error.is_construction());
    }
}
