//! HTTP request building and dispatch, with a thin TestRail client on top.
//!
//! # Overview
//! `RequestBuilder` turns a method, a URL template, path and query
//! parameters, headers and a body into an `HttpRequest`, logging the
//! equivalent curl command as it does. `Dispatcher` sends those requests and
//! buffers the responses. `TestRailClient` uses both to find or create test
//! runs and report results to them.
//!
//! # Design
//! - Request construction never touches the network; `Transport` is the one
//!   I/O seam, so the client can be driven by canned responses in tests.
//! - Builders are not consumed by `build`, and the same state always builds
//!   the same request.
//! - Transport failures are returned as errors, never turned into a process
//!   exit.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod builder;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod method;
pub mod testrail;
pub mod types;

pub use builder::RequestBuilder;
pub use dispatch::{Dispatcher, Transport};
pub use error::{ApiError, BuildError, TransportError, UrlError};
pub use self::http::{HttpRequest, HttpResponse};
pub use method::HttpMethod;
pub use testrail::{find_run_id, TestRailClient, TestRailConfig};
pub use types::{Results, RunList, TestResult, TestRun, STATUS_FAILED, STATUS_PASSED};
