//! The single response shape every user endpoint answers with.
//!
//! Successes carry `result`, failures carry `error`; the other side is always
//! `null`. Failures also carry the request path and a timestamp, filled in by
//! [`crate::middleware::normalize`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub result: Option<T>,
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl<T> Envelope<T> {
    pub fn success(status: StatusCode, result: T) -> Self {
        Self {
            status: status.as_u16(),
            result: Some(result),
            error: None,
            path: None,
            timestamp: None,
        }
    }
}

impl Envelope<Value> {
    pub fn failure(failure: &Failure) -> Self {
        Self {
            status: failure.status.as_u16(),
            result: None,
            error: Some(ErrorBody {
                message: failure.message.clone(),
            }),
            path: None,
            timestamp: None,
        }
    }

    pub fn at(mut self, path: String) -> Self {
        self.path = Some(path);
        self.timestamp = Some(chrono::Utc::now().to_rfc3339());
        self
    }
}

/// A classified failure. Travels in the response extensions so the
/// normalizer can log it and stamp the envelope with the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub status: StatusCode,
    pub message: String,
}

impl Failure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(Envelope::failure(&self))).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// A successful handler result and the status it should be reported with.
#[derive(Debug)]
pub struct Reply<T> {
    status: StatusCode,
    value: T,
}

impl<T> Reply<T> {
    pub fn ok(value: T) -> Self {
        Self {
            status: StatusCode::OK,
            value,
        }
    }

    pub fn created(value: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            value,
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let value = match serde_json::to_value(&self.value) {
            Ok(value) => value,
            Err(e) => {
                return AppError::internal(format!("Failed to serialize response: {e}"))
                    .into_response();
            }
        };

        if let Some(failure) = embedded_failure(&value) {
            return failure.into_response();
        }

        (self.status, Json(Envelope::success(self.status, value))).into_response()
    }
}

/// Empty `204` answer.
#[derive(Debug)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

/// A value shaped `{"error": {"code": 4xx, "error": "..." | ["...", ...]}}`
/// reports a failure even though it came back on the success path.
fn embedded_failure(value: &Value) -> Option<Failure> {
    let error = value.get("error")?;
    let code = error.get("code")?.as_u64()?;
    let status = u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())?;
    let message = match error.get("error")? {
        Value::String(message) => message.clone(),
        Value::Array(messages) => messages.first()?.as_str()?.to_string(),
        _ => return None,
    };
    Some(Failure::new(status, message))
}
