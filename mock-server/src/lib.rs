use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// The only bearer token the server accepts.
pub const API_KEY: &str = "test-key";

const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub team_type: String,
}

#[derive(Deserialize)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: String,
    pub state_or_province: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub code: String,
    pub address: String,
    pub lifecycle_state: String,
    pub closing_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub page_number: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub total_count: u64,
    pub results: Vec<T>,
}

pub struct AppState {
    teams: RwLock<Vec<Team>>,
    agents: Vec<Agent>,
    transactions: Vec<Transaction>,
    hits: Mutex<HashMap<String, u32>>,
}

impl AppState {
    pub fn seeded() -> Arc<Self> {
        Arc::new(Self {
            teams: RwLock::new(seed_teams()),
            agents: seed_agents(),
            transactions: seed_transactions(),
            hits: Mutex::new(HashMap::new()),
        })
    }

    /// Number of requests that reached `path`, authorized or not.
    pub fn hits(&self, path: &str) -> u32 {
        self.hits
            .lock()
            .map(|hits| hits.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn record_hit(&self, path: &str) -> u32 {
        let mut hits = match self.hits.lock() {
            Ok(hits) => hits,
            Err(poisoned) => poisoned.into_inner(),
        };
        let count = hits.entry(path.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

pub fn team_id(n: u128) -> Uuid {
    Uuid::from_u128(0x7ea0_0000 + n)
}

pub fn agent_id(n: u128) -> Uuid {
    Uuid::from_u128(0xa6e0_0000 + n)
}

pub fn transaction_id(n: u128) -> Uuid {
    Uuid::from_u128(0x7a40_0000 + n)
}

fn seed_teams() -> Vec<Team> {
    [
        ("Bay Area Closers", "ACTIVE", "NORMAL"),
        ("Lone Star Group", "ACTIVE", "GROUP"),
        ("Empire Platinum", "ACTIVE", "PLATINUM"),
        ("Sunshine Pros", "INACTIVE", "PRO"),
        ("Cascade Domestic", "ACTIVE", "DOMESTIC"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (name, status, team_type))| Team {
        id: team_id(i as u128 + 1),
        name: name.to_string(),
        status: status.to_string(),
        team_type: team_type.to_string(),
    })
    .collect()
}

fn seed_agents() -> Vec<Agent> {
    [
        ("Ada", "Lovelace", "ACTIVE", "CALIFORNIA"),
        ("Grace", "Hopper", "ACTIVE", "TEXAS"),
        ("Alan", "Turing", "INACTIVE", "CALIFORNIA"),
        ("Edsger", "Dijkstra", "ACTIVE", "NEW_YORK"),
        ("Barbara", "Liskov", "CANDIDATE", "TEXAS"),
        ("Donald", "Knuth", "ACTIVE", "FLORIDA"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (first, last, status, region))| Agent {
        id: agent_id(i as u128 + 1),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@example.com", first.to_lowercase()),
        status: status.to_string(),
        state_or_province: region.to_string(),
    })
    .collect()
}

fn seed_transactions() -> Vec<Transaction> {
    [
        ("TX-1001", "1 Market St", "CLOSED", Some("2024-05-20")),
        ("TX-1002", "200 Congress Ave", "SETTLED", Some("2024-07-02")),
        ("TX-1003", "5 Broadway", "NEW", None),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (code, address, state, closing))| Transaction {
        id: transaction_id(i as u128 + 1),
        code: code.to_string(),
        address: address.to_string(),
        lifecycle_state: state.to_string(),
        closing_date: closing.map(str::to_string),
    })
    .collect()
}

/// A JSON error response: `{"message": ...}` plus an optional `Retry-After`.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
    retry_after: Option<u64>,
}

impl ApiFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(json!({ "message": self.message }))).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

pub type Db = Arc<AppState>;

pub fn app() -> Router {
    app_with_state(AppState::seeded())
}

pub fn app_with_state(state: Db) -> Router {
    Router::new()
        .route("/api/v1/teams/search", get(search_teams))
        .route("/api/v1/teams/{id}", get(get_team).patch(update_team))
        .route("/api/v1/agents/search", get(search_agents))
        .route("/api/v1/agents/{id}", get(get_agent))
        .route("/api/v1/transactions/search", get(search_transactions))
        .route("/api/v1/transactions/{id}", get(get_transaction))
        .route("/api/v1/transactions/{id}/pdf", get(transaction_pdf))
        .route("/api/v1/faults/{key}", get(fault))
        .route("/api/v1/slow", get(slow))
        .route("/api/v1/echo", any(echo))
        .layer(middleware::from_fn(require_bearer))
        .layer(middleware::from_fn_with_state(state.clone(), count_hits))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::seeded()).await
}

pub async fn run_with_state(listener: TcpListener, state: Db) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app_with_state(state)).await
}

async fn count_hits(State(db): State<Db>, request: Request, next: Next) -> Response {
    db.record_hit(request.uri().path());
    next.run(request).await
}

async fn require_bearer(request: Request, next: Next) -> Response {
    let expected = format!("Bearer {API_KEY}");
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        return ApiFailure::new(StatusCode::UNAUTHORIZED, "invalid or missing bearer token")
            .into_response();
    }
    next.run(request).await
}

/// Decoded query string that keeps repeated keys.
struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    fn parse(raw: Option<String>) -> Self {
        let raw = raw.unwrap_or_default();
        Self(url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
    }

    fn all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    fn first(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn number<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ApiFailure> {
        match self.first(key) {
            Some(raw) => raw.parse().map_err(|_| {
                ApiFailure::bad_request(format!("{key} must be a number, got `{raw}`"))
            }),
            None => Ok(default),
        }
    }

    /// Values of `key` checked against an allowed token set.
    fn tokens(&self, key: &str, allowed: &[&str]) -> Result<Vec<String>, ApiFailure> {
        self.all(key)
            .into_iter()
            .map(|v| {
                if allowed.contains(&v) {
                    Ok(v.to_string())
                } else {
                    Err(ApiFailure::bad_request(format!("unknown {key} `{v}`")))
                }
            })
            .collect()
    }
}

fn page_of<T: Clone>(items: &[T], query: &QueryPairs) -> Result<PageResponse<T>, ApiFailure> {
    let page_number: u32 = query.number("pageNumber", 0)?;
    let page_size: u32 = query.number("pageSize", DEFAULT_PAGE_SIZE)?;
    if page_size == 0 {
        return Err(ApiFailure::bad_request("pageSize must be at least 1"));
    }
    let start = (page_number as usize).saturating_mul(page_size as usize);
    let results: Vec<T> = items
        .iter()
        .skip(start)
        .take(page_size as usize)
        .cloned()
        .collect();
    Ok(PageResponse {
        page_number,
        page_size,
        has_next: start + results.len() < items.len(),
        total_count: items.len() as u64,
        results,
    })
}

fn sort_by_query<T>(items: &mut [T], query: &QueryPairs, key: impl Fn(&T, &str) -> String) {
    let fields = query.all("sortBy");
    if fields.is_empty() {
        return;
    }
    items.sort_by(|a, b| {
        fields
            .iter()
            .map(|f| key(a, f).cmp(&key(b, f)))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if query.first("sortDirection") == Some("DESC") {
        items.reverse();
    }
}

const TEAM_STATUSES: &[&str] = &["ACTIVE", "INACTIVE"];
const TEAM_TYPES: &[&str] = &["NORMAL", "PLATINUM", "GROUP", "DOMESTIC", "PRO"];
const AGENT_STATUSES: &[&str] = &["CANDIDATE", "ACTIVE", "INACTIVE", "REJECTED"];

async fn search_teams(
    State(db): State<Db>,
    RawQuery(raw): RawQuery,
) -> Result<Json<PageResponse<Team>>, ApiFailure> {
    let query = QueryPairs::parse(raw);
    let statuses = query.tokens("status", TEAM_STATUSES)?;
    let types = query.tokens("teamType", TEAM_TYPES)?;
    let name = query.first("name").map(str::to_lowercase);

    let mut teams: Vec<Team> = db
        .teams
        .read()
        .await
        .iter()
        .filter(|t| statuses.is_empty() || statuses.contains(&t.status))
        .filter(|t| types.is_empty() || types.contains(&t.team_type))
        .filter(|t| name.as_ref().map_or(true, |n| t.name.to_lowercase().contains(n)))
        .cloned()
        .collect();
    sort_by_query(&mut teams, &query, |t, field| match field {
        "name" => t.name.clone(),
        "status" => t.status.clone(),
        _ => String::new(),
    });
    page_of(&teams, &query).map(Json)
}

async fn get_team(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Team>, ApiFailure> {
    let teams = db.teams.read().await;
    teams
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("team"))
}

async fn update_team(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TeamPatch>,
) -> Result<Json<Team>, ApiFailure> {
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiFailure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "name must not be blank",
        ));
    }
    if let Some(status) = patch.status.as_deref() {
        if !TEAM_STATUSES.contains(&status) {
            return Err(ApiFailure::bad_request(format!("unknown status `{status}`")));
        }
    }
    let mut teams = db.teams.write().await;
    let team = teams
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| ApiFailure::not_found("team"))?;
    if let Some(name) = patch.name {
        team.name = name;
    }
    if let Some(status) = patch.status {
        team.status = status;
    }
    Ok(Json(team.clone()))
}

async fn search_agents(
    State(db): State<Db>,
    RawQuery(raw): RawQuery,
) -> Result<Json<PageResponse<Agent>>, ApiFailure> {
    let query = QueryPairs::parse(raw);
    let regions = query.all("stateOrProvince");
    if regions.iter().any(|r| r.contains(',')) {
        return Err(ApiFailure::bad_request(
            "stateOrProvince must be repeated, not comma-joined",
        ));
    }
    let statuses = query.tokens("status", AGENT_STATUSES)?;

    let mut agents: Vec<Agent> = db
        .agents
        .iter()
        .filter(|a| regions.is_empty() || regions.contains(&a.state_or_province.as_str()))
        .filter(|a| statuses.is_empty() || statuses.contains(&a.status))
        .cloned()
        .collect();
    sort_by_query(&mut agents, &query, |a, field| match field {
        "firstName" => a.first_name.clone(),
        "lastName" => a.last_name.clone(),
        _ => String::new(),
    });
    page_of(&agents, &query).map(Json)
}

async fn get_agent(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Agent>, ApiFailure> {
    db.agents
        .iter()
        .find(|a| a.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("agent"))
}

async fn search_transactions(
    State(db): State<Db>,
    RawQuery(raw): RawQuery,
) -> Result<Json<PageResponse<Transaction>>, ApiFailure> {
    let query = QueryPairs::parse(raw);
    let states = query.all("lifecycleState");
    let closed_after = query.first("closedAfter");
    if let Some(date) = closed_after {
        let well_formed = date.len() == 10
            && date
                .char_indices()
                .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
        if !well_formed {
            return Err(ApiFailure::bad_request(format!(
                "closedAfter must be YYYY-MM-DD, got `{date}`"
            )));
        }
    }

    let transactions: Vec<Transaction> = db
        .transactions
        .iter()
        .filter(|t| states.is_empty() || states.contains(&t.lifecycle_state.as_str()))
        .filter(|t| match (closed_after, t.closing_date.as_deref()) {
            (Some(after), Some(closed)) => closed >= after,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .cloned()
        .collect();
    page_of(&transactions, &query).map(Json)
}

async fn get_transaction(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, ApiFailure> {
    db.transactions
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("transaction"))
}

async fn transaction_pdf(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiFailure> {
    let tx = db
        .transactions
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| ApiFailure::not_found("transaction"))?;
    let pdf = format!("%PDF-1.4\n% {} {}\n%%EOF\n", tx.code, tx.address).into_bytes();
    Ok(([(header::CONTENT_TYPE, "application/pdf")], pdf).into_response())
}

/// Fails the first `failures` requests for `key` with `status`, then
/// succeeds with the attempt count.
async fn fault(
    State(db): State<Db>,
    Path(key): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let query = QueryPairs::parse(raw);
    let failures: u32 = query.number("failures", 0)?;
    let status: u16 = query.number("status", 500)?;
    let retry_after: Option<u64> = match query.first("retryAfter") {
        Some(_) => Some(query.number("retryAfter", 0)?),
        None => None,
    };
    let status = StatusCode::from_u16(status)
        .map_err(|_| ApiFailure::bad_request(format!("invalid status {status}")))?;

    let attempt = db.record_hit(&format!("fault:{key}"));
    if attempt <= failures {
        return Err(ApiFailure {
            retry_after,
            ..ApiFailure::new(status, format!("injected failure {attempt} of {failures}"))
        });
    }
    Ok(Json(json!({ "key": key, "attempts": attempt })))
}

async fn slow(RawQuery(raw): RawQuery) -> Result<Json<serde_json::Value>, ApiFailure> {
    let query = QueryPairs::parse(raw);
    let millis: u64 = query.number("millis", 1000)?;
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Ok(Json(json!({ "sleptMillis": millis })))
}

/// Reports the method, content type and JSON body it received.
async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<serde_json::Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    Json(json!({
        "method": method.as_str(),
        "contentType": content_type,
        "body": body,
    }))
}
