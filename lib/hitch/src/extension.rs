//! Ready-made builder extensions.
//!
//! An extension is any `FnOnce(&mut RequestBuilder<T>)`, applied with
//! [`RequestBuilder::with`]. It runs before the request is sent and sees
//! everything configured before it.
//!
//! # Example
//!
//! ```ignore
//! use hitch::extension::bearer_auth;
//!
//! let response = hitch::get("https://api.example.com/me")
//!     .with(bearer_auth("my-secret-token"))
//!     .send()?;
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use hitch_core::RequestBuilder;

/// Sets `Authorization: Bearer <token>`.
pub fn bearer_auth<T>(token: impl Into<String>) -> impl FnOnce(&mut RequestBuilder<T>) {
    let value = format!("Bearer {}", token.into());
    move |builder| {
        builder.set_header("Authorization", value);
    }
}

/// Sets `Authorization: Basic <base64(username:password)>`.
pub fn basic_auth<T>(
    username: impl AsRef<str>,
    password: impl AsRef<str>,
) -> impl FnOnce(&mut RequestBuilder<T>) {
    let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
    let value = format!("Basic {}", STANDARD.encode(credentials));
    move |builder| {
        builder.set_header("Authorization", value);
    }
}
