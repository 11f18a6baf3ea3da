//! Prelude module for convenient imports.
//!
//! ```ignore
//! use hitch::prelude::*;
//! ```

pub use crate::extension::{basic_auth, bearer_auth};
pub use crate::{
    Client, ClientConfig, Error, Form, Method, Part, RequestBuilder, Response, Result, StatusCode,
    Transport, TransportExt,
};
