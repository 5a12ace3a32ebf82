use validator::Validate;

use crate::config::SeedAdmin;
use crate::error::{AppError, StoreCode, StoreError};
use crate::extract::{rejection, FieldOrder};
use crate::models::Role;
use crate::routes::users::CreateUserRequest;
use crate::services::users::CreateUser;
use crate::services::UserService;

/// Create the configured admin account unless the username is already taken.
/// The account must pass the same rules as one created over HTTP.
pub async fn seed_admin(users: &UserService, admin: &SeedAdmin) -> Result<(), AppError> {
    tracing::debug!("Starting database seeding...");

    let request = CreateUserRequest {
        full_name: admin.full_name.clone(),
        username: admin.username.clone(),
        password: admin.password.clone(),
        role: Role::ConstructorAdmin.to_string(),
        status: None,
    };
    if let Err(errors) = request.validate() {
        let err = rejection(&errors, CreateUserRequest::FIELDS);
        tracing::error!(username = %admin.username, "Seed admin rejected: {err}");
        return Err(err);
    }

    let input = CreateUser {
        full_name: admin.full_name.clone(),
        username: admin.username.clone(),
        password: admin.password.clone(),
        role: Role::ConstructorAdmin,
    };

    match users.create(input).await {
        Ok(user) => tracing::info!(user_id = %user.id, username = %user.username, "Seeded admin user"),
        Err(AppError::Store(StoreError::Coded {
            code: StoreCode::DuplicateKey,
            ..
        })) => tracing::debug!(username = %admin.username, "Admin user already present"),
        Err(e) => return Err(e),
    }

    tracing::debug!("Database seeding completed.");
    Ok(())
}
