//! Builder that turns an endpoint template plus parameters into an
//! `HttpRequest`.
//!
//! # Design
//! Path templates name their placeholders (`/api/v1/teams/{teamId}`) and
//! `path_arg` fills them in order of appearance. All argument checking
//! happens in `build`, so a bad ID is reported as `ApiError::Validation`
//! before any network round-trip. The builder is `Clone`, which lets the
//! paginator stamp out a fresh request for every page.

use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, QueryValue};
use crate::params::{Sort, ToQueryValue};

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: HttpMethod,
    template: String,
    path_args: Vec<String>,
    query: Vec<(String, QueryValue)>,
    headers: Vec<(String, String)>,
    body: Option<Result<serde_json::Value, String>>,
}

impl RequestBuilder {
    pub fn new(method: HttpMethod, template: impl Into<String>) -> Self {
        Self {
            method,
            template: template.into(),
            path_args: Vec::new(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, template)
    }

    pub fn post(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, template)
    }

    pub fn put(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, template)
    }

    pub fn patch(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, template)
    }

    pub fn delete(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, template)
    }

    /// Supply the next path placeholder's value.
    pub fn path_arg(mut self, value: impl ToString) -> Self {
        self.path_args.push(value.to_string());
        self
    }

    /// Add a query parameter. Values that encode to nothing (`None`, empty
    /// lists) are skipped.
    pub fn query<V: ToQueryValue + ?Sized>(mut self, key: &str, value: &V) -> Self {
        if let Some(value) = value.to_query_value() {
            self.query.push((key.to_string(), value));
        }
        self
    }

    /// Replace any existing values for `key`.
    pub fn set_query<V: ToQueryValue + ?Sized>(mut self, key: &str, value: &V) -> Self {
        self.query.retain(|(k, _)| k != key);
        self.query(key, value)
    }

    pub fn sort(self, sort: Option<&Sort>) -> Self {
        match sort {
            Some(sort) => self
                .query("sortBy", &sort.fields)
                .query("sortDirection", &sort.direction),
            None => self,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body. Serialization errors surface from `build`.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(serde_json::to_value(body).map_err(|e| e.to_string()));
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn build(&self) -> Result<HttpRequest, ApiError> {
        let path = substitute(&self.template, &self.path_args)?;
        let body = match &self.body {
            Some(Ok(value)) => Some(value.clone()),
            Some(Err(e)) => {
                return Err(ApiError::validation(format!(
                    "request body could not be serialized: {e}"
                )))
            }
            None => None,
        };
        Ok(HttpRequest {
            method: self.method,
            path,
            query: self.query.clone(),
            headers: self.headers.clone(),
            body,
        })
    }
}

/// Fill `{name}` placeholders in order of appearance.
fn substitute(template: &str, args: &[String]) -> Result<String, ApiError> {
    let mut path = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let close = rest[open..].find('}').map(|i| open + i).ok_or_else(|| {
            ApiError::validation(format!("unterminated placeholder in `{template}`"))
        })?;
        let name = &rest[open + 1..close];
        let value = args.next().ok_or_else(|| {
            ApiError::validation(format!("missing path parameter `{name}` for `{template}`"))
        })?;
        if value.trim().is_empty() {
            return Err(ApiError::validation(format!(
                "path parameter `{name}` must not be empty"
            )));
        }
        if value.contains(['/', '?', '#', '%']) {
            return Err(ApiError::validation(format!(
                "path parameter `{name}` contains a reserved character: `{value}`"
            )));
        }
        path.push_str(&rest[..open]);
        path.push_str(value);
        rest = &rest[close + 1..];
    }
    path.push_str(rest);

    let surplus = args.count();
    if surplus > 0 {
        return Err(ApiError::validation(format!(
            "{surplus} unused path parameter(s) for `{template}`"
        )));
    }
    Ok(path)
}
