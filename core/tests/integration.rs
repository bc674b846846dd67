//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port in a background thread
//! with its own tokio runtime, then drives the real ureq transport through
//! the client. The server's per-path hit counters show how many HTTP
//! attempts each call actually made.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use mock_server::{agent_id, team_id, transaction_id, AppState, API_KEY};
use rezen_core::{
    AgentSearch, ApiClient, ApiError, ClientBuilder, LifecycleState, RequestBuilder, Sort,
    StateOrProvince, TeamSearch, TeamStatus, TeamUpdate, Token, TransactionSearch,
};

fn spawn_server() -> (String, Arc<AppState>) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let state = AppState::seeded();
    let server_state = state.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_state(listener, server_state).await
        })
        .unwrap();
    });

    (format!("http://{addr}"), state)
}

fn builder(base_url: &str) -> ClientBuilder {
    ApiClient::builder()
        .api_key(API_KEY)
        .base_url(base_url)
        .base_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(20))
}

fn client(base_url: &str) -> ApiClient {
    builder(base_url).build().unwrap()
}

#[test]
fn pagination_walks_three_pages_then_stops() {
    let (url, state) = spawn_server();
    let client = client(&url);

    let search = TeamSearch {
        page_size: 2,
        ..TeamSearch::default()
    };
    let teams: Vec<_> = client
        .teams()
        .search_teams(&search)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let ids: Vec<_> = teams.iter().map(|t| t.id).collect();
    assert_eq!(ids, (1..=5).map(team_id).collect::<Vec<_>>());
    assert_eq!(state.hits("/api/v1/teams/search"), 3);
}

#[test]
fn empty_first_page_makes_one_call() {
    let (url, state) = spawn_server();
    let client = client(&url);

    let search = TeamSearch {
        name: Some("no team is called this".to_string()),
        ..TeamSearch::default()
    };
    let count = client.teams().search_teams(&search).unwrap().count();
    assert_eq!(count, 0);
    assert_eq!(state.hits("/api/v1/teams/search"), 1);
}

#[test]
fn breaking_early_fetches_no_more_pages() {
    let (url, state) = spawn_server();
    let client = client(&url);

    let search = TeamSearch {
        page_size: 1,
        ..TeamSearch::default()
    };
    let first = client
        .teams()
        .search_teams(&search)
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(first.id, team_id(1));
    assert_eq!(state.hits("/api/v1/teams/search"), 1);
}

#[test]
fn team_lifecycle() {
    let (url, _) = spawn_server();
    let client = client(&url);

    let team = client.teams().get_team(team_id(2)).unwrap();
    assert_eq!(team.name, "Lone Star Group");
    assert_eq!(team.status, Token::Known(TeamStatus::Active));

    let update = TeamUpdate {
        status: Some(TeamStatus::Inactive),
        ..TeamUpdate::default()
    };
    let updated = client.teams().update_team(team_id(2), &update).unwrap();
    assert_eq!(updated.status, Token::Known(TeamStatus::Inactive));
    assert_eq!(updated.name, "Lone Star Group");

    let fetched = client.teams().get_team(team_id(2)).unwrap();
    assert_eq!(fetched, updated);

    let inactive: Vec<_> = client
        .teams()
        .search_teams(&TeamSearch {
            status: Some(TeamStatus::Inactive),
            sort: Some(Sort::asc("name")),
            ..TeamSearch::default()
        })
        .unwrap()
        .map(|t| t.unwrap().name)
        .collect();
    assert_eq!(inactive, vec!["Lone Star Group", "Sunshine Pros"]);
}

#[test]
fn validation_error_is_not_retried() {
    let (url, state) = spawn_server();
    let client = client(&url);

    let update = TeamUpdate {
        name: Some("   ".to_string()),
        ..TeamUpdate::default()
    };
    let err = client.teams().update_team(team_id(1), &update).unwrap_err();
    assert!(matches!(err, ApiError::Validation { status: Some(422), .. }));
    assert_eq!(err.message(), "name must not be blank");
    assert_eq!(state.hits(&format!("/api/v1/teams/{}", team_id(1))), 1);
}

#[test]
fn not_found_is_not_retried() {
    let (url, state) = spawn_server();
    let client = client(&url);

    let missing = agent_id(404);
    let err = client.agents().get_agent(missing).unwrap_err();
    assert!(matches!(err, ApiError::NotFound { status: Some(404), .. }));
    assert!(err.body().unwrap().contains("agent not found"));
    assert_eq!(state.hits(&format!("/api/v1/agents/{missing}")), 1);
}

#[test]
fn wrong_key_is_an_authentication_error() {
    let (url, state) = spawn_server();
    let client = ApiClient::builder()
        .api_key("not-the-key")
        .base_url(url)
        .build()
        .unwrap();

    let err = client.teams().get_team(team_id(1)).unwrap_err();
    assert!(matches!(err, ApiError::Authentication { status: Some(401), .. }));
    assert_eq!(state.hits(&format!("/api/v1/teams/{}", team_id(1))), 1);
}

#[test]
fn repeated_state_filters_reach_the_server() {
    let (url, _) = spawn_server();
    let client = client(&url);

    let search = AgentSearch {
        states_or_provinces: vec![StateOrProvince::California, StateOrProvince::Texas],
        sort: Some(Sort::asc("lastName")),
        ..AgentSearch::default()
    };
    let names: Vec<_> = client
        .agents()
        .search_agents(&search)
        .unwrap()
        .map(|a| a.unwrap().last_name)
        .collect();
    assert_eq!(names, vec!["Hopper", "Liskov", "Lovelace", "Turing"]);
}

#[test]
fn transaction_search_and_pdf_download() {
    let (url, _) = spawn_server();
    let client = client(&url);

    let search = TransactionSearch {
        lifecycle_states: vec![LifecycleState::Closed, LifecycleState::Settled],
        closed_after: NaiveDate::from_ymd_opt(2024, 6, 1),
        ..TransactionSearch::default()
    };
    let codes: Vec<_> = client
        .transactions()
        .search_transactions(&search)
        .unwrap()
        .map(|t| t.unwrap().code)
        .collect();
    assert_eq!(codes, vec!["TX-1002"]);

    let tx = client.transactions().get_transaction(transaction_id(1)).unwrap();
    assert_eq!(tx.closing_date, NaiveDate::from_ymd_opt(2024, 5, 20));

    let pdf = client.transactions().download_pdf(transaction_id(1)).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert!(String::from_utf8_lossy(&pdf).contains("TX-1001"));
}

#[test]
fn json_body_is_sent_with_every_method() {
    let (url, _) = spawn_server();
    let client = client(&url);

    for request in [
        RequestBuilder::delete("/api/v1/echo"),
        RequestBuilder::get("/api/v1/echo"),
        RequestBuilder::post("/api/v1/echo"),
        RequestBuilder::patch("/api/v1/echo"),
    ] {
        let method = request.method();
        let echoed: serde_json::Value = client
            .execute_json(&request.json(&serde_json::json!({ "memberId": "a-1" })))
            .unwrap();
        assert_eq!(echoed["method"], method.as_str());
        assert_eq!(echoed["contentType"], "application/json");
        assert_eq!(echoed["body"]["memberId"], "a-1", "{method} body");
    }
}

#[test]
fn bodyless_delete_sends_no_content_type() {
    let (url, _) = spawn_server();
    let client = client(&url);

    let echoed: serde_json::Value = client
        .execute_json(&RequestBuilder::delete("/api/v1/echo"))
        .unwrap();
    assert_eq!(echoed["method"], "DELETE");
    assert!(echoed["contentType"].is_null());
    assert!(echoed["body"].is_null());
}

#[test]
fn server_errors_recover_within_attempts() {
    let (url, state) = spawn_server();
    let client = builder(&url).max_attempts(3).build().unwrap();

    let body: serde_json::Value = client
        .execute_json(
            &RequestBuilder::get("/api/v1/faults/{key}")
                .path_arg("recovers")
                .query("failures", &2u32)
                .query("status", &503u16),
        )
        .unwrap();
    assert_eq!(body["attempts"], 3);
    assert_eq!(state.hits("/api/v1/faults/recovers"), 3);
}

#[test]
fn server_errors_exhaust_attempts() {
    let (url, state) = spawn_server();
    let client = builder(&url).max_attempts(3).build().unwrap();

    let err = client
        .execute(
            &RequestBuilder::get("/api/v1/faults/{key}")
                .path_arg("down")
                .query("failures", &10u32)
                .query("status", &500u16),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::Server { status: Some(500), .. }));
    assert_eq!(err.message(), "injected failure 3 of 10");
    assert_eq!(state.hits("/api/v1/faults/down"), 3);
}

#[test]
fn rate_limit_honors_retry_after() {
    let (url, state) = spawn_server();
    let client = builder(&url).max_attempts(2).build().unwrap();

    let started = Instant::now();
    let body: serde_json::Value = client
        .execute_json(
            &RequestBuilder::get("/api/v1/faults/{key}")
                .path_arg("throttled")
                .query("failures", &1u32)
                .query("status", &429u16)
                .query("retryAfter", &1u64),
        )
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(body["attempts"], 2);
    assert_eq!(state.hits("/api/v1/faults/throttled"), 2);
}

#[test]
fn timeout_is_a_network_error_and_retried() {
    let (url, state) = spawn_server();
    let client = builder(&url)
        .timeout(Duration::from_millis(200))
        .max_attempts(2)
        .build()
        .unwrap();

    let err = client
        .execute(&RequestBuilder::get("/api/v1/slow").query("millis", &2_000u64))
        .unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }));
    assert_eq!(err.status(), None);
    assert_eq!(state.hits("/api/v1/slow"), 2);
}

#[test]
fn refused_connection_is_a_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = builder(&format!("http://127.0.0.1:{port}"))
        .max_attempts(2)
        .build()
        .unwrap();

    let err = client.teams().get_team(team_id(1)).unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }));
    assert!(err.is_retryable());
}
