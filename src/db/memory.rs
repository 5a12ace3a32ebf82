use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{cast_id, check_document, PageRequest, UserFilter, UserStore};
use crate::error::{AppError, StoreError};
use crate::models::{NewUser, Status, User};

/// Process-local store with the same contract as [`super::PgUserStore`].
/// Records are kept in insertion order, which is also `created_at` order.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_username(username: &str) -> StoreError {
    StoreError::duplicate_key(
        "duplicate key value violates unique constraint \"users_username_key\"",
        vec![("username".to_string(), username.to_string())],
    )
}

fn contains_ci(haystack: &str, needle: &Option<String>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

fn is_match(user: &User, filter: &UserFilter, status: Status) -> bool {
    user.status == status
        && contains_ci(&user.full_name, &filter.full_name)
        && contains_ci(&user.username, &filter.username)
        && filter.role.is_none_or(|role| user.role == role)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: &str, status: Status) -> Result<Option<User>, AppError> {
        let id = cast_id(id)?;
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.id == id && u.status == status)
            .cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
        status: Status,
    ) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username == username && u.status == status)
            .cloned())
    }

    async fn find_page(
        &self,
        filter: &UserFilter,
        status: Status,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), AppError> {
        let users = self.users.read().await;
        let mut matching: Vec<&User> = users.iter().filter(|u| is_match(u, filter, status)).collect();
        matching.sort_by_key(|u| u.created_at);

        let total = matching.len() as u64;
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.limit).unwrap_or(usize::MAX);
        let data = matching.into_iter().skip(skip).take(take).cloned().collect();
        Ok((data, total))
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        check_document(&user.full_name, &user.username, &user.password_hash)?;

        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(duplicate_username(&user.username).into());
        }
        let user = user.into_user(Uuid::now_v7());
        users.push(user.clone());
        Ok(user)
    }

    async fn save(&self, user: &User, expected: Status) -> Result<User, AppError> {
        check_document(&user.full_name, &user.username, &user.password_hash)?;

        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(duplicate_username(&user.username).into());
        }
        let stored = users
            .iter_mut()
            .find(|u| u.id == user.id && u.status == expected)
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let created_at = stored.created_at;
        *stored = User {
            created_at,
            ..user.clone()
        };
        Ok(stored.clone())
    }
}
