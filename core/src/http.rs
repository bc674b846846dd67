//! HTTP request descriptors and response envelopes as plain data.
//!
//! # Design
//! `HttpRequest` is what the request builder produces and what the transport
//! consumes: a method, a base-relative path with arguments already
//! substituted, ordered query parameters, extra headers, and an optional
//! structured JSON body. `HttpResponse` is the raw status/headers/bytes
//! envelope of a single attempt, handed to the error mapper for
//! classification. Neither type touches the network, so both can be built
//! and inspected directly in tests.

use std::fmt;

use serde_json::Value;
use url::Url;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value side of a query parameter. `Many` is sent as one `key=value`
/// pair per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    Many(Vec<String>),
}

impl QueryValue {
    pub fn values(&self) -> &[String] {
        match self {
            QueryValue::Single(value) => std::slice::from_ref(value),
            QueryValue::Many(values) => values,
        }
    }
}

/// A request described as plain data.
///
/// Built by `RequestBuilder::build`. `path` is relative to the client's base
/// URL and never contains a query string.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, QueryValue)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Query parameters flattened into `key=value` pairs, in insertion order.
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        self.query
            .iter()
            .flat_map(|(key, value)| {
                value
                    .values()
                    .iter()
                    .map(move |v| (key.as_str(), v.as_str()))
            })
            .collect()
    }

    /// Resolve the full URL against `base_url`.
    pub fn url(&self, base_url: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::validation(format!("invalid request URL `{raw}`: {e}")))?;
        let pairs = self.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The raw envelope of one HTTP attempt.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A successfully classified response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Bytes(Vec<u8>),
}
