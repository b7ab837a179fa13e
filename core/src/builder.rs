//! Fluent assembler for `HttpRequest` values.
//!
//! # Design
//! `RequestBuilder` only accumulates intent: a method, a URL template with
//! `{name}` placeholders, path parameters, query parameters, headers and a
//! body. Nothing is resolved until `build`, which is a pure function of the
//! current state and can be called any number of times. Map-like inputs are
//! kept in `BTreeMap`s so the same state always yields the same URL, header
//! order and curl line.
//!
//! Two separate body rules apply:
//! - the body is attached to the request only for POST, PUT and PATCH;
//! - the curl line shows `-d` for any method other than GET and DELETE when
//!   the body is non-empty.

use std::collections::BTreeMap;
use std::fmt;

use log::info;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::{Position, Url};

use crate::error::{BuildError, UrlError};
use crate::http::HttpRequest;
use crate::method::HttpMethod;

/// Accumulates request parameters through chainable setters.
///
/// ```
/// use testrail_core::{HttpMethod, RequestBuilder};
///
/// let req = RequestBuilder::new()
///     .set_method(HttpMethod::Get)
///     .set_url_template("http://localhost/api/resource/{id}")
///     .add_path_param("id", "42")
///     .build()
///     .unwrap();
/// assert_eq!(req.url, "http://localhost/api/resource/42");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    method: Option<HttpMethod>,
    url_template: String,
    path_params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    body: Option<String>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_method(&mut self, method: HttpMethod) -> &mut Self {
        self.method = Some(method);
        self
    }

    /// Placeholders look like `{id}`. They are not validated here; one with
    /// no matching path parameter stays in the URL as written.
    pub fn set_url_template(&mut self, template: impl Into<String>) -> &mut Self {
        self.url_template = template.into();
        self
    }

    pub fn add_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Adds a query parameter. One value per key; the last one wins.
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Resolve the current state into a request and log the equivalent curl
    /// command.
    pub fn build(&self) -> Result<HttpRequest, BuildError> {
        let (request, curl) = self.build_with_curl()?;
        info!("generated curl command: {curl}");
        Ok(request)
    }

    /// Same as `build`, but returns the curl command instead of logging it.
    pub fn build_with_curl(&self) -> Result<(HttpRequest, String), BuildError> {
        let method = self.method.ok_or(BuildError::MissingMethod)?;

        let resolved = substitute_path_params(&self.url_template, &self.path_params);
        let mut target = Target::parse(&resolved).map_err(|source| BuildError::InvalidUrl {
            url: resolved.clone(),
            source,
        })?;
        if !self.params.is_empty() {
            target.merge_query(&self.params);
        }
        let url = target.to_string();

        http::Uri::try_from(url.as_str()).map_err(|source| BuildError::RequestConstruction {
            url: url.clone(),
            source,
        })?;

        let body = if attaches_body(method) {
            Some(self.body.clone().unwrap_or_default())
        } else {
            None
        };
        let headers = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let curl = curl_command(method, &url, &self.headers, self.body.as_deref());

        Ok((
            HttpRequest {
                method,
                url,
                headers,
                body,
            },
            curl,
        ))
    }
}

fn attaches_body(method: HttpMethod) -> bool {
    matches!(method, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
}

/// Render the shell command that would send the same request.
fn curl_command(
    method: HttpMethod,
    url: &str,
    headers: &BTreeMap<String, String>,
    body: Option<&str>,
) -> String {
    let mut cmd = format!("curl -X {method} '{url}'");
    for (key, value) in headers {
        cmd.push_str(&format!(" -H '{key}: {value}'"));
    }
    if method != HttpMethod::Get && method != HttpMethod::Delete {
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            cmd.push_str(&format!(" -d '{body}'"));
        }
    }
    cmd
}

/// Replace each `{key}` in `template` with its parameter value in one left to
/// right scan. Substituted text is never scanned again, and placeholders with
/// no parameter are copied through unchanged. Keys may themselves contain
/// `}`; when several keys match at the same position the longest one wins.
fn substitute_path_params(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];
        let matched = params
            .iter()
            .filter(|(key, _)| {
                candidate
                    .strip_prefix(key.as_str())
                    .is_some_and(|after| after.starts_with('}'))
            })
            .max_by_key(|(key, _)| key.len());
        match matched {
            Some((key, value)) => {
                out.push_str(value);
                rest = &candidate[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Bytes that may not appear raw in a request target. Braces stay literal so
/// unresolved placeholders survive, and `%` is kept so existing escapes are
/// not encoded twice.
const TARGET: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// A parsed URL split so the query can be replaced without touching the rest.
/// The path, query and fragment are percent-encoded where the raw text is not
/// a valid request target; everything already valid is kept as written.
#[derive(Debug)]
struct Target {
    origin: String,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Target {
    /// Absolute URLs must satisfy the WHATWG parser. Relative references such
    /// as `/users/7` are accepted as long as they cannot be mistaken for a
    /// scheme.
    fn parse(raw: &str) -> Result<Self, UrlError> {
        let absolute = match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                check_relative(raw)?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        let (rest, fragment) = match raw.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (raw, None),
        };
        let (head, query) = match rest.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (rest, None),
        };
        let (origin, path) = match &absolute {
            Some(url) => (
                url[..Position::BeforePath].to_string(),
                &head[path_start(head)..],
            ),
            None => (String::new(), head),
        };

        Ok(Self {
            origin,
            path: encode(path),
            query: query.map(encode),
            fragment: fragment.map(encode),
        })
    }

    /// Merge `params` into the existing query. Existing pairs are kept, and
    /// the result is re-encoded in key order.
    fn merge_query(&mut self, params: &BTreeMap<String, String>) {
        let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(query) = &self.query {
            for (k, v) in form_urlencoded::parse(query.as_bytes()) {
                merged.entry(k.into_owned()).or_default().push(v.into_owned());
            }
        }
        for (k, v) in params {
            merged.entry(k.clone()).or_default().push(v.clone());
        }

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, values) in &merged {
            for v in values {
                serializer.append_pair(k, v);
            }
        }
        self.query = Some(serializer.finish());
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin, self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, TARGET).to_string()
}

/// Byte offset where the path starts in the text before `?`/`#` of an
/// absolute URL.
fn path_start(head: &str) -> usize {
    match head.find("://") {
        Some(i) => {
            let authority = i + 3;
            head[authority..]
                .find('/')
                .map_or(head.len(), |j| authority + j)
        }
        None => head.find(':').map_or(0, |i| i + 1),
    }
}

fn check_relative(raw: &str) -> Result<(), UrlError> {
    let path = raw.split(['?', '#']).next().unwrap_or_default();
    let first = path.split('/').next().unwrap_or_default();
    if first.contains(':') {
        return Err(UrlError::ColonInFirstSegment(first.to_string()));
    }
    Ok(())
}
