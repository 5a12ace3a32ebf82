use std::backtrace::Backtrace;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::error::DatabaseError;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

use crate::envelope::Failure;

pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// Every way a request can fail. Each variant is produced where the failure
/// originates; [`AppError::classify`] turns it into a status and message.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected before or inside business logic with an explicit status.
    /// Validation rejections carry one message per failing field, in the
    /// declared order of the request type.
    #[error("{status}: {}", .messages.join("; "))]
    Rejected {
        status: StatusCode,
        messages: Vec<String>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{message}")]
    Internal {
        message: String,
        trace: Arc<Backtrace>,
    },
    /// Something that is not an error value at all, e.g. a panic payload.
    #[error("unknown failure: {0}")]
    Unknown(String),
}

/// Failures raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{message}")]
    Coded {
        code: StoreCode,
        message: String,
        /// Offending unique-index keys and their values, in store order.
        keys: Vec<(String, String)>,
    },
    #[error("cast to {kind} failed for value \"{value}\" at field \"{field}\"")]
    Cast {
        kind: String,
        value: String,
        field: String,
    },
    #[error("validation failed")]
    Validation { errors: Vec<FieldError> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCode {
    DuplicateKey,
    DocumentValidation,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl AppError {
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Rejected {
            status,
            messages: vec![message.into()],
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::rejected(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::rejected(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::rejected(StatusCode::NOT_FOUND, message)
    }

    /// Unexpected failure. Captures a stack trace for the diagnostic log.
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
            trace: Arc::new(Backtrace::force_capture()),
        }
    }

    /// Map the failure to the status and message the client sees.
    pub fn classify(&self) -> Failure {
        match self {
            AppError::Rejected { status, messages } => Failure::new(
                *status,
                messages
                    .first()
                    .cloned()
                    .unwrap_or_else(|| default_message(*status)),
            ),
            AppError::Store(err) => err.classify(),
            AppError::Internal { message, trace } => {
                tracing::error!("Unhandled exception: {message}\n{trace}");
                Failure::new(StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
            AppError::Unknown(raw) => {
                tracing::error!("Unknown error type: {raw}");
                Failure::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl StoreError {
    pub fn duplicate_key(message: impl Into<String>, keys: Vec<(String, String)>) -> Self {
        StoreError::Coded {
            code: StoreCode::DuplicateKey,
            message: message.into(),
            keys,
        }
    }

    pub fn cast(kind: &str, value: &str, field: &str) -> Self {
        StoreError::Cast {
            kind: kind.to_string(),
            value: value.to_string(),
            field: field.to_string(),
        }
    }

    fn classify(&self) -> Failure {
        match self {
            StoreError::Coded {
                code: StoreCode::DuplicateKey,
                keys,
                ..
            } => {
                let fields: Vec<&str> = keys.iter().map(|(field, _)| field.as_str()).collect();
                let values: Vec<&str> = keys.iter().map(|(_, value)| value.as_str()).collect();
                Failure::new(
                    StatusCode::CONFLICT,
                    format!(
                        "A record with {} '{}' already exists",
                        fields.join(", "),
                        values.join(", ")
                    ),
                )
            }
            StoreError::Coded {
                code: StoreCode::DocumentValidation,
                ..
            } => Failure::new(StatusCode::BAD_REQUEST, "Document validation failed"),
            StoreError::Coded { message, .. } => {
                Failure::new(StatusCode::BAD_REQUEST, message.clone())
            }
            StoreError::Cast { kind, value, field } => Failure::new(
                StatusCode::BAD_REQUEST,
                format!("Invalid {kind} value '{value}' for field '{field}'"),
            ),
            StoreError::Validation { errors } => Failure::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            ),
        }
    }

    /// Translate a driver-level database error by its SQLSTATE.
    pub fn from_database(err: &(dyn DatabaseError + 'static)) -> Self {
        let message = err.message().to_string();
        match err.code().as_deref() {
            // unique_violation
            Some("23505") => {
                let keys = err
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(|pg| pg.detail())
                    .map(parse_duplicate_detail)
                    .unwrap_or_default();
                StoreError::duplicate_key(message, keys)
            }
            // not_null_violation, check_violation
            Some("23502") | Some("23514") => StoreError::Coded {
                code: StoreCode::DocumentValidation,
                message,
                keys: Vec::new(),
            },
            code => StoreError::Coded {
                code: StoreCode::Other(code.unwrap_or_default().to_string()),
                message,
                keys: Vec::new(),
            },
        }
    }
}

/// Parse Postgres' `Key (a, b)=(x, y) already exists.` detail line.
fn parse_duplicate_detail(detail: &str) -> Vec<(String, String)> {
    let Some(rest) = detail.strip_prefix("Key (") else {
        return Vec::new();
    };
    let Some((fields, rest)) = rest.split_once(")=(") else {
        return Vec::new();
    };
    let Some((values, _)) = rest.rsplit_once(") already exists") else {
        return Vec::new();
    };
    fields
        .split(", ")
        .zip(values.split(", "))
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or(INTERNAL_SERVER_ERROR)
        .to_string()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.classify().into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => AppError::Store(StoreError::from_database(db.as_ref())),
            other => AppError::internal(format!("Database error: {other}")),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::rejected(rejection.status(), rejection.body_text())
    }
}
