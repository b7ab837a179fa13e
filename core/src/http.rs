//! HTTP transport types shared by the builder, the dispatcher and the API
//! client.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The builder
//! produces `HttpRequest` values without touching the network; whoever holds
//! a `Transport` executes them and hands back an `HttpResponse`. Keeping the
//! boundary as data makes request construction deterministic and lets the
//! API client be tested against canned responses.

use std::borrow::Cow;

use crate::method::HttpMethod;

/// A fully resolved HTTP request described as plain data.
///
/// Produced by `RequestBuilder::build`. The builder keeps no reference to it;
/// the caller owns it and passes it to a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Template-substituted URL with the encoded query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Only ever `Some` for methods that carry a body.
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value whose name matches `name` exactly.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response with its body fully buffered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
