//! Multipart form data.
//!
//! [`Form`] assembles a `multipart/form-data` buffer that can be handed to
//! `RequestBuilder::multipart_form`, or encoded with [`Form::into_body`] and
//! passed to `RequestBuilder::multipart` together with its content type.
//!
//! # Example
//!
//! ```
//! use hitch_core::{Form, Part};
//!
//! let form = Form::with_boundary("xyz")
//!     .text("name", "John Doe")
//!     .part(Part::file("avatar", "photo.png", vec![0x89, 0x50]));
//!
//! let (content_type, body) = form.into_body();
//! assert_eq!(content_type, "multipart/form-data; boundary=xyz");
//! assert!(body.ends_with(b"--xyz--\r\n"));
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

/// A single field of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a part with no filename and no content type.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Create a `text/plain; charset=utf-8` part.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        Self::new(name, value).with_content_type("text/plain; charset=utf-8")
    }

    /// Create a file part; the content type is guessed from the extension.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self::new(name, data)
            .with_filename(filename)
            .with_content_type(content_type)
    }

    /// Set the filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Raw data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    fn write_to(&self, boundary: &str, buf: &mut BytesMut) {
        buf.put_slice(format!("--{boundary}\r\n").as_bytes());

        let mut disposition = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            quote(&self.name)
        );
        if let Some(filename) = &self.filename {
            disposition.push_str(&format!("; filename=\"{}\"", quote(filename)));
        }
        buf.put_slice(disposition.as_bytes());
        buf.put_slice(b"\r\n");

        if let Some(content_type) = &self.content_type {
            buf.put_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }

        buf.put_slice(b"\r\n");
        buf.put_slice(&self.data);
        buf.put_slice(b"\r\n");
    }
}

/// Escape `"` and strip line breaks, which would end the header value.
fn quote(value: &str) -> String {
    value.replace(['\r', '\n'], "").replace('"', "%22")
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}

/// A multipart form: an ordered list of parts and a boundary.
#[derive(Debug, Clone)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create an empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self::with_boundary(format!("----HitchBoundary{nanos:x}"))
    }

    /// Create an empty form with a caller-chosen boundary.
    ///
    /// The boundary must not appear in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Append a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Append a text field.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parts, in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode into (content type, body).
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        let mut buf = BytesMut::new();
        for part in &self.parts {
            part.write_to(&self.boundary, &mut buf);
        }
        buf.put_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (self.content_type(), buf.freeze())
    }
}
