use std::any::Any;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::envelope::{Envelope, Failure};
use crate::error::AppError;

/// Logs every request and gives every failed response the error envelope,
/// stamped with the request path.
pub async fn normalize(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    tracing::info!("Processing {method} {path}");

    let mut response = next.run(req).await;

    let failure = match response.extensions_mut().remove::<Failure>() {
        Some(failure) => failure,
        // Failures produced outside our handlers, e.g. the router's 405.
        None if response.status().is_client_error() || response.status().is_server_error() => {
            Failure::new(
                response.status(),
                response.status().canonical_reason().unwrap_or("Error"),
            )
        }
        None => return response,
    };

    if failure.status.is_server_error() {
        tracing::error!(status = failure.status.as_u16(), "{method} {path}: {}", failure.message);
    } else {
        tracing::warn!(status = failure.status.as_u16(), "{method} {path}: {}", failure.message);
    }

    let mut rebuilt = (failure.status, Json(Envelope::failure(&failure).at(path))).into_response();
    for (name, value) in response.headers() {
        if name != axum::http::header::CONTENT_TYPE && name != axum::http::header::CONTENT_LENGTH {
            rebuilt.headers_mut().append(name.clone(), value.clone());
        }
    }
    rebuilt
}

/// Turn a panic inside a handler into the "not an error value" failure.
pub fn recover_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let raw = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "non-string panic payload".to_string()
    };
    AppError::Unknown(raw).into_response()
}
