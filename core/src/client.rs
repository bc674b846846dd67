//! The client that ties the request pipeline together.
//!
//! # Design
//! `ApiClient` owns its credentials, configuration, one pooled transport and
//! a retry policy; nothing is process-global. A call goes
//! `RequestBuilder::build` -> `RetryPolicy::execute` -> `Transport::send` ->
//! `classify`, and every attempt re-sends the same descriptor with the
//! credentials attached. Resource clients (`teams()`, `agents()`, ...) borrow
//! the client and only shape requests and responses.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::classify::classify;
use crate::config::{ClientBuilder, ClientConfig};
use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::http::{HttpRequest, ResponseBody};
use crate::pagination::{Page, PageCursor, PageShape, Paginator};
use crate::request::RequestBuilder;
use crate::resources::{AgentsApi, TeamsApi, TransactionsApi};
use crate::retry::RetryPolicy;
use crate::transport::Transport;

pub struct ApiClient {
    credentials: Credentials,
    config: ClientConfig,
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client with default configuration. `api_key` falls back to
    /// `REZEN_API_KEY`.
    pub fn new(api_key: Option<&str>) -> Result<Self, ApiError> {
        let builder = ClientBuilder::new();
        match api_key {
            Some(key) => builder.api_key(key).build(),
            None => builder.build(),
        }
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        credentials: Credentials,
        config: ClientConfig,
        transport: Box<dyn Transport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            credentials,
            config,
            transport,
            retry,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.credentials.base_url()
    }

    pub fn teams(&self) -> TeamsApi<'_> {
        TeamsApi::new(self)
    }

    pub fn agents(&self) -> AgentsApi<'_> {
        AgentsApi::new(self)
    }

    pub fn transactions(&self) -> TransactionsApi<'_> {
        TransactionsApi::new(self)
    }

    /// Send a built request through the retry policy and classify the
    /// response.
    pub fn send(&self, request: &HttpRequest) -> Result<(u16, ResponseBody), ApiError> {
        self.retry.execute(|attempt| {
            debug!(
                method = %request.method,
                path = %request.path,
                attempt = attempt + 1,
                "sending request"
            );
            let response = self.transport.send(request, &self.credentials)?;
            debug!(status = response.status, path = %request.path, "received response");
            classify(&response).map(|body| (response.status, body))
        })
    }

    /// Build and execute a request, returning the classified body.
    pub fn execute(&self, request: &RequestBuilder) -> Result<ResponseBody, ApiError> {
        let request = request.build()?;
        self.send(&request).map(|(_, body)| body)
    }

    /// Execute and deserialize a JSON response.
    pub fn execute_json<T: DeserializeOwned>(
        &self,
        request: &RequestBuilder,
    ) -> Result<T, ApiError> {
        let request = request.build()?;
        let (status, body) = self.send(&request)?;
        decode_json(status, body)
    }

    /// Execute a request whose success body is binary.
    pub fn execute_bytes(&self, request: &RequestBuilder) -> Result<Vec<u8>, ApiError> {
        match self.execute(request)? {
            ResponseBody::Bytes(bytes) => Ok(bytes),
            ResponseBody::Json(Value::Null) => Ok(Vec::new()),
            ResponseBody::Json(value) => Ok(value.to_string().into_bytes()),
        }
    }

    /// Iterate over every record of a paged endpoint. Each page is a fresh
    /// request built from `request` with `pageNumber`/`pageSize` set.
    pub fn paginate<'a, T: DeserializeOwned + 'a>(
        &'a self,
        request: RequestBuilder,
        page_size: u32,
        shape: PageShape,
    ) -> Result<Paginator<T, impl FnMut(PageCursor) -> Result<Page<T>, ApiError> + 'a>, ApiError>
    {
        Paginator::new(page_size, move |cursor: PageCursor| {
            let page_request = request
                .clone()
                .set_query("pageNumber", &cursor.page_number)
                .set_query("pageSize", &cursor.page_size)
                .build()?;
            let (status, body) = self.send(&page_request)?;
            match body {
                ResponseBody::Json(value) => shape.decode(status, value),
                ResponseBody::Bytes(bytes) => Err(ApiError::decode(
                    status,
                    "paged endpoint returned a non-JSON body",
                    String::from_utf8_lossy(&bytes),
                )),
            }
        })
    }
}

fn decode_json<T: DeserializeOwned>(status: u16, body: ResponseBody) -> Result<T, ApiError> {
    match body {
        ResponseBody::Json(value) => {
            let raw = value.to_string();
            serde_json::from_value(value).map_err(|e| {
                ApiError::decode(status, format!("response could not be decoded: {e}"), raw)
            })
        }
        ResponseBody::Bytes(bytes) => Err(ApiError::decode(
            status,
            "expected a JSON response body",
            String::from_utf8_lossy(&bytes),
        )),
    }
}
