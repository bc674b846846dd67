//! Blocking HTTP transport.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. `UreqTransport` owns one
//! pooled `ureq::Agent` for the lifetime of a client and never interprets
//! status codes: `http_status_as_error(false)` makes every status come back
//! as data for the error mapper. Anything ureq itself fails with (DNS,
//! connect, TLS, timeout, I/O) becomes `ApiError::Network`. A JSON body is
//! sent with `Content-Type: application/json` whatever the method, including
//! GET and DELETE.

use std::time::Duration;

use tracing::debug;

use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

const JSON: &str = "application/json";

/// Upper bound on a response body read into memory.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Sends one request and returns its raw envelope.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest, credentials: &Credentials)
        -> Result<HttpResponse, ApiError>;
}

/// Settings applied to the pooled agent.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .timeout_connect(Some(config.connect_timeout))
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.user_agent.clone(),
        }
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: &HttpRequest,
        credentials: &Credentials,
    ) -> Result<HttpResponse, ApiError> {
        let url = request.url(credentials.base_url())?;
        let accept = request.header("accept").unwrap_or(JSON).to_string();
        let body = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ApiError::validation(format!("request body could not be encoded: {e}")))?;

        debug!(method = %request.method, url = %url, "dispatching request");

        macro_rules! with_headers {
            ($builder:expr) => {{
                let mut builder = $builder
                    .header("Authorization", credentials.bearer())
                    .header("Accept", accept.as_str())
                    .header("User-Agent", self.user_agent.as_str());
                for (name, value) in &request.headers {
                    if !name.eq_ignore_ascii_case("accept") {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                }
                builder
            }};
        }

        let url = url.as_str();
        let result = match (request.method, body) {
            (HttpMethod::Get, Some(body)) => with_headers!(self.agent.get(url))
                .force_send_body()
                .content_type(JSON)
                .send(&body[..]),
            (HttpMethod::Get, None) => with_headers!(self.agent.get(url)).call(),
            (HttpMethod::Delete, Some(body)) => with_headers!(self.agent.delete(url))
                .force_send_body()
                .content_type(JSON)
                .send(&body[..]),
            (HttpMethod::Delete, None) => with_headers!(self.agent.delete(url)).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers!(self.agent.post(url)).content_type(JSON).send(&body[..])
            }
            (HttpMethod::Post, None) => with_headers!(self.agent.post(url)).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers!(self.agent.put(url)).content_type(JSON).send(&body[..])
            }
            (HttpMethod::Put, None) => with_headers!(self.agent.put(url)).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                with_headers!(self.agent.patch(url)).content_type(JSON).send(&body[..])
            }
            (HttpMethod::Patch, None) => with_headers!(self.agent.patch(url)).send_empty(),
        };

        let mut response = result.map_err(|e| ApiError::network(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| ApiError::network(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
