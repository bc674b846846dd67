//! Blocking client core for the reZEN real-estate API.
//!
//! # Overview
//! Every endpoint call flows through the same pipeline: a `RequestBuilder`
//! produces an `HttpRequest`, the `RetryPolicy` drives the `Transport` one
//! attempt at a time with credentials attached, and `classify` turns each
//! raw `HttpResponse` into a decoded body or exactly one `ApiError` variant.
//! Paged endpoints are exposed as a lazy `Paginator`.
//!
//! # Design
//! - `ApiClient` is constructed once and owns its credentials, configuration
//!   and connection pool; there is no process-wide state.
//! - Calls block the calling thread, including backoff sleeps.
//! - Transient failures (429, 5xx, network) are retried with exponential
//!   backoff; client errors (400, 401, 404, 422) are returned on first
//!   sight.
//! - Parameter tokens are closed enums, so invalid filters are rejected
//!   locally.
//!
//! ```no_run
//! use rezen_core::{AgentSearch, ApiClient, StateOrProvince};
//!
//! # fn main() -> Result<(), rezen_core::ApiError> {
//! let client = ApiClient::new(None)?;
//! let search = AgentSearch {
//!     states_or_provinces: vec![StateOrProvince::California, StateOrProvince::Texas],
//!     ..AgentSearch::default()
//! };
//! for agent in client.agents().search_agents(&search)? {
//!     let agent = agent?;
//!     println!("{} {}", agent.first_name, agent.last_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod pagination;
pub mod params;
pub mod request;
pub mod resources;
pub mod retry;
pub mod transport;
pub mod types;

pub use classify::classify;
pub use client::ApiClient;
pub use config::{ClientBuilder, ClientConfig};
pub use credentials::{Credentials, API_KEY_ENV, BASE_URL_ENV, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, QueryValue, ResponseBody};
pub use pagination::{Page, PageCursor, PageShape, Paginator};
pub use params::{
    AgentStatus, LifecycleState, Sort, SortDirection, StateOrProvince, TeamStatus, TeamType,
    ToQueryValue,
};
pub use request::RequestBuilder;
pub use resources::{
    AgentSearch, AgentsApi, TeamSearch, TeamsApi, TransactionSearch, TransactionsApi,
};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use transport::{Transport, TransportConfig, UreqTransport};
pub use types::{Agent, Team, TeamUpdate, Token, Transaction};
