//! Request extractors whose rejections are [`AppError`]s, so malformed input
//! goes through the same classification as every other failure.

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// Declared field order of a request type. Validation messages are reported
/// in this order, first failing rule per field.
pub trait FieldOrder {
    const FIELDS: &'static [&'static str];
}

pub(crate) fn rejection(errors: &ValidationErrors, fields: &[&str]) -> AppError {
    let by_field = errors.field_errors();

    let mut messages: Vec<String> = fields
        .iter()
        .filter_map(|field| {
            let first = by_field.get(*field)?.first()?;
            Some(match &first.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();

    if messages.is_empty() {
        messages.push("Validation failed".to_string());
    }

    AppError::Rejected {
        status: StatusCode::BAD_REQUEST,
        messages,
    }
}

/// JSON body, deserialized then validated.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + FieldOrder,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate().map_err(|e| rejection(&e, T::FIELDS))?;
        Ok(ValidatedJson(data))
    }
}

/// Query string, deserialized then validated.
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate + FieldOrder,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(data) = Query::<T>::from_request_parts(parts, state).await?;
        data.validate().map_err(|e| rejection(&e, T::FIELDS))?;
        Ok(ValidatedQuery(data))
    }
}

/// The `{id}` path segment, left as text. The store decides whether it is a
/// well-formed id.
pub struct IdPath(pub String);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<String>::from_request_parts(parts, state).await?;
        Ok(IdPath(id))
    }
}
