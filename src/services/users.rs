//! User lifecycle: credential checks, token issuance and the
//! `Active <-> Inactive` state machine.
//!
//! Every lookup is constrained to the state the operation expects. A record
//! in the other state is reported exactly like a missing one.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::jwt::TokenIssuer;
use crate::auth::password::Hasher;
use crate::db::{PageRequest, UserFilter, UserStore};
use crate::error::AppError;
use crate::models::user::now;
use crate::models::{NewUser, Page, Role, Status, User, UserRecord};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const USER_NOT_FOUND: &str = "User not found";

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub full_name: String,
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// The fields an update may touch. Anything else (id, status, timestamps)
/// only changes through the dedicated operations.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInResponse {
    pub access_token: String,
    /// Role permissions are not wired up yet; always empty.
    pub permissions: Vec<String>,
    pub user: LogInUser,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInUser {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
}

pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: Hasher,
    tokens: TokenIssuer,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Hasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Active user whose password matches. Missing user and wrong password
    /// fail identically.
    #[tracing::instrument(skip(self, password))]
    pub async fn validate_credentials(&self, username: &str, password: &str) -> Result<User, AppError> {
        let Some(user) = self.store.find_by_username(username, Status::Active).await? else {
            tracing::debug!("user not found");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        let valid = self
            .hasher
            .verify(password, &user.password_hash)
            .map_err(AppError::internal)?;
        if !valid {
            tracing::debug!("password mismatch");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        Ok(user)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn log_in(&self, username: &str, password: &str) -> Result<LogInResponse, AppError> {
        let user = self.validate_credentials(username, password).await?;

        let access_token = self
            .tokens
            .issue(user.id, user.role)
            .map_err(AppError::internal)?;

        tracing::debug!(user_id = %user.id, "issued access token");
        Ok(LogInResponse {
            access_token,
            permissions: Vec::new(),
            user: LogInUser {
                id: user.id,
                full_name: user.full_name,
                role: user.role,
            },
        })
    }

    /// A taken username surfaces as the store's duplicate-key error.
    #[tracing::instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create(&self, input: CreateUser) -> Result<UserRecord, AppError> {
        let password_hash = self.hasher.hash(&input.password).map_err(AppError::internal)?;

        let user = self
            .store
            .insert(NewUser {
                full_name: input.full_name,
                username: input.username,
                password_hash,
                role: input.role,
                status: Status::Active,
                created_at: now(),
            })
            .await?;

        tracing::debug!(user_id = %user.id, "user created");
        Ok(user.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> Result<UserRecord, AppError> {
        Ok(self.find_in_state(id, Status::Active).await?.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_all(&self, filter: UserFilter, page: PageRequest) -> Result<Page<UserRecord>, AppError> {
        let (users, total) = self.store.find_page(&filter, Status::Active, page).await?;
        tracing::debug!(total, "listed users");
        Ok(Page::new(users, total, page.page, page.limit).map(UserRecord::from))
    }

    #[tracing::instrument(skip(self, changes))]
    pub async fn update(&self, id: &str, changes: UserChanges) -> Result<UserRecord, AppError> {
        let mut user = self.find_in_state(id, Status::Active).await?;

        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(password) = changes.password {
            user.password_hash = self.hasher.hash(&password).map_err(AppError::internal)?;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        user.updated_at = Some(now());

        Ok(self.store.save(&user, Status::Active).await?.into())
    }

    /// Soft delete: `Active -> Inactive`.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut user = self.find_in_state(id, Status::Active).await?;

        let at = now();
        user.status = Status::Inactive;
        user.deleted_at = Some(at);
        user.updated_at = Some(at);
        self.store.save(&user, Status::Active).await?;

        tracing::debug!(user_id = %user.id, "user deleted");
        Ok(())
    }

    /// `Inactive -> Active`.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self, id: &str) -> Result<UserRecord, AppError> {
        let mut user = self.find_in_state(id, Status::Inactive).await?;

        user.status = Status::Active;
        user.deleted_at = None;
        user.updated_at = Some(now());
        let user = self.store.save(&user, Status::Inactive).await?;

        tracing::debug!(user_id = %user.id, "user restored");
        Ok(user.into())
    }

    async fn find_in_state(&self, id: &str, status: Status) -> Result<User, AppError> {
        self.store.find_by_id(id, status).await?.ok_or_else(|| {
            tracing::debug!("user not found");
            AppError::not_found(USER_NOT_FOUND)
        })
    }
}
