//! Maps a raw `HttpResponse` to a decoded body or an `ApiError` variant.
//!
//! # Design
//! Classification is a pure function of the envelope: the status picks the
//! variant, the body is always attached to errors, and a 2xx body is decoded
//! according to its content type so binary endpoints (PDF downloads) come
//! back as bytes instead of failing JSON parsing.

use std::time::Duration;

use serde_json::Value;
use ureq::http::StatusCode;

use crate::error::ApiError;
use crate::http::{HttpResponse, ResponseBody};

/// Fields checked, in order, for a human-readable message in an error body.
const MESSAGE_FIELDS: &[&str] = &["message", "errorMessage", "error"];

pub fn classify(response: &HttpResponse) -> Result<ResponseBody, ApiError> {
    let status = response.status;
    if (200..300).contains(&status) {
        return decode_success(response);
    }

    let body = Some(response.text());
    let message = error_message(response);
    let status = Some(status);
    let err = match response.status {
        401 => ApiError::Authentication {
            status,
            message,
            body,
        },
        400 | 422 => ApiError::Validation {
            status,
            message,
            body,
        },
        404 => ApiError::NotFound {
            status,
            message,
            body,
        },
        429 => ApiError::RateLimit {
            status,
            message,
            body,
            retry_after: retry_after(response),
        },
        500..=599 => ApiError::Server {
            status,
            message,
            body,
        },
        _ => ApiError::Api {
            status,
            message,
            body,
        },
    };
    Err(err)
}

fn decode_success(response: &HttpResponse) -> Result<ResponseBody, ApiError> {
    let media_type = response
        .content_type()
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase());

    match media_type.as_deref() {
        Some(mt) if !is_json(mt) => Ok(ResponseBody::Bytes(response.body.clone())),
        _ if response.body.iter().all(u8::is_ascii_whitespace) => {
            Ok(ResponseBody::Json(Value::Null))
        }
        Some(_) => serde_json::from_slice(&response.body)
            .map(ResponseBody::Json)
            .map_err(|e| {
                ApiError::decode(
                    response.status,
                    format!("response body is not valid JSON: {e}"),
                    response.text(),
                )
            }),
        None => Ok(serde_json::from_slice(&response.body)
            .map(ResponseBody::Json)
            .unwrap_or_else(|_| ResponseBody::Bytes(response.body.clone()))),
    }
}

fn is_json(media_type: &str) -> bool {
    media_type == "application/json" || media_type.ends_with("+json")
}

fn error_message(response: &HttpResponse) -> String {
    let from_body = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            MESSAGE_FIELDS
                .iter()
                .find_map(|field| body.get(field).and_then(Value::as_str).map(str::to_string))
        })
        .filter(|m| !m.trim().is_empty());

    from_body.unwrap_or_else(|| {
        StatusCode::from_u16(response.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unexpected status")
            .to_string()
    })
}

/// `Retry-After` as delta-seconds. The HTTP-date form is not honored.
fn retry_after(response: &HttpResponse) -> Option<Duration> {
    response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
