use std::borrow::Cow;

use axum::extract::State;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::db::{PageRequest, UserFilter};
use crate::envelope::{NoContent, Reply};
use crate::error::AppError;
use crate::extract::{FieldOrder, IdPath, ValidatedJson, ValidatedQuery};
use crate::models::{Page, Role, UserRecord};
use crate::services::users::{CreateUser, LogInResponse, UserChanges};
use crate::state::SharedState;

pub const WEAK_PASSWORD: &str =
    "Password too weak. Must include uppercase, lowercase, number, and special character.";

const ROLE_MESSAGE: &str =
    "role must be one of the following values: constructor-admin, o-manager, executor, operator";

const SPECIAL_CHARS: &str = "@$!%*?&-_()";

#[derive(Deserialize, Validate)]
pub struct LogInRequest {
    #[validate(length(min = 1, message = "username should not be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "password should not be empty"))]
    pub password: String,
}

impl FieldOrder for LogInRequest {
    const FIELDS: &'static [&'static str] = &["username", "password"];
}

#[derive(Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(alias = "fullName")]
    #[validate(length(min = 2, max = 200, message = "full_name must be between 2 and 200 characters"))]
    pub full_name: String,
    #[validate(length(min = 3, max = 50, message = "username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(
        length(min = 8, max = 100, message = "password must be between 8 and 100 characters"),
        custom(function = "password_strength")
    )]
    pub password: String,
    #[validate(custom(function = "known_role"))]
    pub role: String,
    /// Accepted for compatibility; new users always start active.
    #[validate(range(min = 0, max = 1, message = "status must be 0 or 1"))]
    pub status: Option<i16>,
}

impl FieldOrder for CreateUserRequest {
    const FIELDS: &'static [&'static str] = &["full_name", "username", "password", "role", "status"];
}

/// Fields not listed here are ignored.
#[derive(Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(default, alias = "fullName")]
    #[validate(length(min = 2, max = 200, message = "full_name must be between 2 and 200 characters"))]
    pub full_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 3, max = 50, message = "username must be between 3 and 50 characters"))]
    pub username: Option<String>,
    #[serde(default)]
    #[validate(
        length(min = 8, max = 100, message = "password must be between 8 and 100 characters"),
        custom(function = "password_strength")
    )]
    pub password: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "known_role"))]
    pub role: Option<String>,
}

impl FieldOrder for UpdateUserRequest {
    const FIELDS: &'static [&'static str] = &["full_name", "username", "password", "role"];
}

#[derive(Deserialize, Validate)]
pub struct ListUsersQuery {
    pub full_name: Option<String>,
    pub username: Option<String>,
    #[validate(custom(function = "known_role_or_blank"))]
    pub role: Option<String>,
    #[validate(range(min = 1, message = "page must not be less than 1"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, message = "limit must not be less than 1"))]
    pub limit: Option<u64>,
}

impl FieldOrder for ListUsersQuery {
    const FIELDS: &'static [&'static str] = &["full_name", "username", "role", "page", "limit"];
}

fn password_strength(password: &str) -> Result<(), ValidationError> {
    let strong = password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIAL_CHARS.contains(c));
    if strong {
        Ok(())
    } else {
        Err(ValidationError::new("password_strength").with_message(Cow::Borrowed(WEAK_PASSWORD)))
    }
}

fn known_role(role: &str) -> Result<(), ValidationError> {
    parse_role(role)
        .map(|_| ())
        .map_err(|_| ValidationError::new("role").with_message(Cow::Borrowed(ROLE_MESSAGE)))
}

/// Query filters treat an empty value as absent.
fn known_role_or_blank(role: &str) -> Result<(), ValidationError> {
    if role.is_empty() {
        return Ok(());
    }
    known_role(role)
}

fn parse_role(role: &str) -> Result<Role, AppError> {
    role.parse().map_err(|_| AppError::bad_request(ROLE_MESSAGE))
}

/// Drop empty filter values so `?username=` means "no filter".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn log_in(
    State(state): State<SharedState>,
    ValidatedJson(req): ValidatedJson<LogInRequest>,
) -> Result<Reply<LogInResponse>, AppError> {
    let response = state.users.log_in(&req.username, &req.password).await?;
    Ok(Reply::ok(response))
}

pub async fn create(
    State(state): State<SharedState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<Reply<UserRecord>, AppError> {
    let input = CreateUser {
        full_name: req.full_name,
        username: req.username,
        password: req.password,
        role: parse_role(&req.role)?,
    };
    let user = state.users.create(input).await?;
    Ok(Reply::created(user))
}

pub async fn get(
    State(state): State<SharedState>,
    IdPath(id): IdPath,
) -> Result<Reply<UserRecord>, AppError> {
    let user = state.users.get_by_id(&id).await?;
    Ok(Reply::ok(user))
}

pub async fn list(
    State(state): State<SharedState>,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> Result<Reply<Page<UserRecord>>, AppError> {
    let filter = UserFilter {
        full_name: non_empty(query.full_name),
        username: non_empty(query.username),
        role: non_empty(query.role).as_deref().map(parse_role).transpose()?,
    };
    let page = state
        .users
        .get_all(filter, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(Reply::ok(page))
}

pub async fn update(
    State(state): State<SharedState>,
    IdPath(id): IdPath,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Reply<UserRecord>, AppError> {
    let changes = UserChanges {
        full_name: req.full_name,
        username: req.username,
        password: req.password,
        role: req.role.as_deref().map(parse_role).transpose()?,
    };
    let user = state.users.update(&id, changes).await?;
    Ok(Reply::ok(user))
}

pub async fn delete(
    State(state): State<SharedState>,
    IdPath(id): IdPath,
) -> Result<NoContent, AppError> {
    state.users.delete(&id).await?;
    Ok(NoContent)
}

pub async fn restore(
    State(state): State<SharedState>,
    IdPath(id): IdPath,
) -> Result<Reply<UserRecord>, AppError> {
    let user = state.users.restore(&id).await?;
    Ok(Reply::ok(user))
}
