//! Core types and traits for the hitch fluent HTTP request builder.
//!
//! This crate provides the transport-agnostic pieces of hitch:
//! - [`Method`] - HTTP method enum
//! - [`Request`], [`BodySource`] and [`RequestBuilder`] - error-deferring request construction
//! - [`Transport`] and [`TransportExt`] - the execution seam and per-method constructors
//! - [`Response`] and [`ResponseBody`] - lazily read, cached response bodies
//! - [`Error`] and [`Result`] - Error handling
//! - [`Form`] and [`Part`] - multipart form encoding
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)

mod body;
mod error;
mod method;
mod multipart;
mod request;
mod response;
mod transport;

pub use body::{ContentType, from_json, to_form, to_json};
pub use error::{Error, Result};
pub use method::Method;
pub use multipart::{Form, Part};
pub use request::{BodySource, Request, RequestBuilder};
pub use response::{Response, ResponseBody};
pub use transport::{Transport, TransportExt};

// Re-export http crate types for status codes
pub use http::StatusCode;
