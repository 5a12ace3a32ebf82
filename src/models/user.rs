use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds since the Unix epoch. Every timestamp on a user uses this encoding.
pub type Timestamp = i64;

pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ConstructorAdmin,
    OManager,
    Executor,
    Operator,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::ConstructorAdmin,
        Role::OManager,
        Role::Executor,
        Role::Operator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ConstructorAdmin => "constructor-admin",
            Role::OManager => "o-manager",
            Role::Executor => "executor",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL.into_iter().find(|r| r.as_str() == s).ok_or(())
    }
}

/// Record status. Serialized as its integer code (`1` active, `0` inactive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum Status {
    Inactive = 0,
    Active = 1,
}

impl From<Status> for i16 {
    fn from(status: Status) -> Self {
        status as i16
    }
}

impl TryFrom<i16> for Status {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::Inactive),
            1 => Ok(Status::Active),
            other => Err(format!("unknown status code {other}")),
        }
    }
}

/// A persisted user, including the password hash. Never serialized directly;
/// responses go through [`UserRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
}

/// A user about to be inserted. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub status: Status,
    pub created_at: Timestamp,
}

impl NewUser {
    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            full_name: self.full_name,
            username: self.username,
            password_hash: self.password_hash,
            role: self.role,
            status: self.status,
            created_at: self.created_at,
            updated_at: None,
            deleted_at: None,
        }
    }
}

/// Public view of a user returned by every user endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub role: Role,
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            username: user.username,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
            deleted_at: user.deleted_at,
        }
    }
}
