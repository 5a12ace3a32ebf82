use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{cast_id, check_document, PageRequest, UserFilter, UserStore};
use crate::error::{AppError, StoreError};
use crate::models::{NewUser, Role, Status, User};

const COLUMNS: &str =
    "id, full_name, username, password_hash, role, status, created_at, updated_at, deleted_at";

// $1 status, $2 full_name, $3 username, $4 role
const FILTER: &str = "WHERE status = $1
       AND ($2::text IS NULL OR full_name ILIKE '%' || $2 || '%')
       AND ($3::text IS NULL OR username ILIKE '%' || $3 || '%')
       AND ($4::text IS NULL OR role = $4)";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    username: String,
    password_hash: String,
    role: String,
    status: i16,
    created_at: i64,
    updated_at: Option<i64>,
    deleted_at: Option<i64>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|_| StoreError::cast("role", &row.role, "role"))?;
        let status = Status::try_from(row.status)
            .map_err(|_| StoreError::cast("status", &row.status.to_string(), "status"))?;
        Ok(User {
            id: row.id,
            full_name: row.full_name,
            username: row.username,
            password_hash: row.password_hash,
            role,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn into_user(row: Option<UserRow>) -> Result<Option<User>, AppError> {
    Ok(row.map(User::try_from).transpose()?)
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: &str, status: Status) -> Result<Option<User>, AppError> {
        let id = cast_id(id)?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users WHERE id = $1 AND status = $2"
        ))
        .bind(id)
        .bind(i16::from(status))
        .fetch_optional(&self.pool)
        .await?;
        into_user(row)
    }

    async fn find_by_username(
        &self,
        username: &str,
        status: Status,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users WHERE username = $1 AND status = $2"
        ))
        .bind(username)
        .bind(i16::from(status))
        .fetch_optional(&self.pool)
        .await?;
        into_user(row)
    }

    async fn find_page(
        &self,
        filter: &UserFilter,
        status: Status,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), AppError> {
        let full_name = filter.full_name.as_deref().map(escape_like);
        let username = filter.username.as_deref().map(escape_like);
        let role = filter.role.map(|r| r.as_str());

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM users {FILTER}"))
                .bind(i16::from(status))
                .bind(&full_name)
                .bind(&username)
                .bind(role)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users {FILTER}
             ORDER BY created_at ASC, id ASC
             LIMIT $5 OFFSET $6"
        ))
        .bind(i16::from(status))
        .bind(&full_name)
        .bind(&username)
        .bind(role)
        .bind(to_i64(page.limit))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((users, u64::try_from(total).unwrap_or(0)))
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        check_document(&user.full_name, &user.username, &user.password_hash)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, full_name, username, password_hash, role, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(i16::from(user.status))
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(User::try_from(row)?)
    }

    async fn save(&self, user: &User, expected: Status) -> Result<User, AppError> {
        check_document(&user.full_name, &user.username, &user.password_hash)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users
             SET full_name = $2, username = $3, password_hash = $4, role = $5,
                 status = $6, updated_at = $7, deleted_at = $8
             WHERE id = $1 AND status = $9 RETURNING {COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(i16::from(user.status))
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .bind(i16::from(expected))
        .fetch_optional(&self.pool)
        .await?;

        into_user(row)?.ok_or_else(|| AppError::not_found("User not found"))
    }
}
