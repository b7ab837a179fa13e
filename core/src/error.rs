//! Error types for request construction, dispatch and the TestRail client.
//!
//! # Design
//! One enum per layer. `BuildError` is what `RequestBuilder::build` can fail
//! with, `TransportError` is what a `Transport` can fail with, and `ApiError`
//! wraps both for the TestRail client. Underlying causes are kept as sources
//! rather than flattened into strings where the cause is a typed error.
//!
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." All other non-200 responses land in `HttpError` with the raw
//! status code and body for debugging.

/// Why a resolved URL string could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    /// A relative reference whose first path segment contains a colon would
    /// be read as a scheme.
    #[error("first path segment in relative URL cannot contain a colon: '{0}'")]
    ColonInFirstSegment(String),
}

/// Errors returned by `RequestBuilder::build`.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no HTTP method set")]
    MissingMethod,

    #[error("error parsing URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: UrlError,
    },

    /// The URL parsed but is not usable as an HTTP request target.
    #[error("error creating request for '{url}'")]
    RequestConstruction {
        url: String,
        #[source]
        source: http::uri::InvalidUri,
    },
}

/// Errors returned by a `Transport`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("error assembling request")]
    Request(#[from] http::Error),

    #[error("error sending request")]
    Send(#[source] ureq::Error),

    #[error("error reading response")]
    ReadBody(#[source] ureq::Error),
}

/// Errors returned by `TestRailClient`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server returned 404, the requested run does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a status other than 200 or 404.
    #[error("TestRail API error: HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed")]
    DeserializationError(#[source] serde_json::Error),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed")]
    SerializationError(#[source] serde_json::Error),

    /// Updating a run needs the run's id.
    #[error("test run '{0}' has no id")]
    MissingRunId(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
