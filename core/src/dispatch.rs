//! Executing built requests.
//!
//! # Design
//! `Transport` is the only I/O seam in the crate: the TestRail client runs
//! every request through one, so tests can hand it a closure returning canned
//! responses. `Dispatcher` is the real implementation, a blocking ureq agent
//! that fully buffers each response body before returning. Transport failures
//! come back as `TransportError` for the caller to act on.

use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use log::{debug, info};
use ureq::Agent;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Something that can execute an `HttpRequest`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

/// Blocking HTTP dispatcher.
///
/// Non-2xx statuses are returned as data, not errors, so callers decide how
/// to interpret them.
#[derive(Clone)]
pub struct Dispatcher {
    agent: Agent,
}

impl Dispatcher {
    /// A dispatcher with no deadline.
    pub fn new() -> Self {
        Self::with_config(None)
    }

    /// A dispatcher that abandons any call taking longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_config(Some(timeout))
    }

    fn with_config(timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Send `request`, buffer the whole body and log it.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut response = self.run(request)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(TransportError::ReadBody)?;

        info!("response: {}", String::from_utf8_lossy(&body));
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Like `send`, returning just the status code and the raw body.
    pub fn send_preserve_status(&self, request: &HttpRequest) -> Result<(u16, Vec<u8>), TransportError> {
        let response = self.send(request)?;
        Ok((response.status, response.body))
    }

    fn run(&self, request: &HttpRequest) -> Result<http::Response<ureq::Body>, TransportError> {
        let headers = header_map(&request.headers)?;
        let builder = http::Request::builder()
            .method(http::Method::from(request.method))
            .uri(request.url.as_str());

        debug!("sending {} {}", request.method, request.url);
        let result = match &request.body {
            Some(body) => self.agent.run(with_headers(builder.body(body.clone())?, headers)),
            None => self.agent.run(with_headers(builder.body(())?, headers)),
        };
        result.map_err(TransportError::Send)
    }
}

/// Header names are case-insensitive on the wire, so keys differing only in
/// case collapse into one header. The last one in `headers` wins.
fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, http::Error> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(http::Error::from)?;
        let value = HeaderValue::from_str(value).map_err(http::Error::from)?;
        map.insert(name, value);
    }
    Ok(map)
}

fn with_headers<B>(mut request: http::Request<B>, headers: HeaderMap) -> http::Request<B> {
    *request.headers_mut() = headers;
    request
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for Dispatcher {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.send(request)
    }
}
