//! Verify the error mapper and request builder against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector file describes inputs and expected outcomes. Comparing parsed
//! JSON (not raw strings) avoids false negatives from field ordering.

use std::time::Duration;

use rezen_core::{
    classify, ApiError, HttpMethod, HttpResponse, QueryValue, RequestBuilder, ResponseBody,
};

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn variant_name(err: &ApiError) -> &'static str {
    match err {
        ApiError::Authentication { .. } => "Authentication",
        ApiError::Validation { .. } => "Validation",
        ApiError::NotFound { .. } => "NotFound",
        ApiError::RateLimit { .. } => "RateLimit",
        ApiError::Server { .. } => "Server",
        ApiError::Network { .. } => "Network",
        ApiError::Api { .. } => "Api",
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn classify_test_vectors() {
    let raw = include_str!("../../test-vectors/classify.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let status = sim["status"].as_u64().unwrap() as u16;
        let body = sim["body"].as_str().unwrap();

        let mut response = HttpResponse::new(status, body);
        if let Some(ct) = sim["content_type"].as_str() {
            response = response.with_header("Content-Type", ct);
        }
        if let Some(retry_after) = sim["retry_after"].as_str() {
            response = response.with_header("Retry-After", retry_after);
        }

        let expected = &case["expected"];
        let outcome = classify(&response);
        match expected["outcome"].as_str().unwrap() {
            "json" => {
                assert_eq!(
                    outcome.unwrap(),
                    ResponseBody::Json(expected["value"].clone()),
                    "{name}: json body"
                );
            }
            "bytes" => {
                let bytes = expected["value"].as_str().unwrap().as_bytes().to_vec();
                assert_eq!(outcome.unwrap(), ResponseBody::Bytes(bytes), "{name}: bytes body");
            }
            "error" => {
                let err = outcome.unwrap_err();
                assert_eq!(
                    variant_name(&err),
                    expected["variant"].as_str().unwrap(),
                    "{name}: variant"
                );
                assert_eq!(err.status(), Some(status), "{name}: status kept");
                assert_eq!(err.body(), Some(body), "{name}: body kept");
                if let Some(message) = expected["message"].as_str() {
                    assert_eq!(err.message(), message, "{name}: message");
                }
                if let Some(secs) = expected["retry_after_secs"].as_u64() {
                    assert_eq!(
                        err.retry_after(),
                        Some(Duration::from_secs(secs)),
                        "{name}: retry-after"
                    );
                }
            }
            other => panic!("{name}: unknown outcome {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let method = parse_method(case["method"].as_str().unwrap());
        let mut builder = RequestBuilder::new(method, case["template"].as_str().unwrap());
        for arg in case["path_args"].as_array().unwrap() {
            builder = builder.path_arg(arg.as_str().unwrap());
        }
        for param in case["query"].as_array().unwrap() {
            let key = param[0].as_str().unwrap();
            builder = match &param[1] {
                serde_json::Value::Array(values) => {
                    let values: Vec<&str> = values.iter().map(|v| v.as_str().unwrap()).collect();
                    builder.query(key, &values)
                }
                value => builder.query(key, value.as_str().unwrap()),
            };
        }

        let expected = &case["expected"];
        if let Some(variant) = expected["error"].as_str() {
            let err = builder.build().unwrap_err();
            assert_eq!(variant_name(&err), variant, "{name}: error variant");
            continue;
        }

        let req = builder.build().unwrap();
        assert_eq!(req.method, method, "{name}: method");
        assert_eq!(req.path, expected["path"].as_str().unwrap(), "{name}: path");
        let expected_pairs: Vec<(&str, &str)> = expected["query"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| (p[0].as_str().unwrap(), p[1].as_str().unwrap()))
            .collect();
        assert_eq!(req.query_pairs(), expected_pairs, "{name}: query");
        assert!(req
            .query
            .iter()
            .all(|(_, v)| !matches!(v, QueryValue::Many(vs) if vs.is_empty())));
    }
}
