pub mod memory;
pub mod users;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, FieldError, StoreError};
use crate::models::{NewUser, Role, Status, User};

pub use memory::MemoryUserStore;
pub use users::PgUserStore;

/// Listing filter. Text fields match case-insensitive substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u64 = 1;
    pub const DEFAULT_LIMIT: u64 = 10;

    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(Self::DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Where user records live. Every method filters on the status the caller
/// expects, so a record in the other state looks absent.
///
/// Implementations enforce username uniqueness themselves and report a
/// violation as a duplicate-key [`StoreError`]; callers never check first.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &str, status: Status) -> Result<Option<User>, AppError>;

    async fn find_by_username(
        &self,
        username: &str,
        status: Status,
    ) -> Result<Option<User>, AppError>;

    /// Records matching `filter`, oldest first, plus the total match count.
    async fn find_page(
        &self,
        filter: &UserFilter,
        status: Status,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), AppError>;

    async fn insert(&self, user: NewUser) -> Result<User, AppError>;

    /// Overwrite the stored record with the same id, provided it is still in
    /// the `expected` state. `created_at` is kept. A record that is gone or
    /// has changed state meanwhile is reported as not found.
    async fn save(&self, user: &User, expected: Status) -> Result<User, AppError>;
}

pub(crate) fn cast_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::cast("uuid", id, "id"))
}

/// Schema check run before every write.
pub(crate) fn check_document(
    full_name: &str,
    username: &str,
    password_hash: &str,
) -> Result<(), StoreError> {
    let errors: Vec<FieldError> = [
        ("full_name", full_name),
        ("username", username),
        ("password", password_hash),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| FieldError {
        field: field.to_string(),
        message: format!("Path `{field}` is required."),
    })
    .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation { errors })
    }
}
