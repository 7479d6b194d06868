use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::role::Role;

/// A backoffice system user. Stored with the password hash; use
/// `ApiUserResponse` when sending one over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// New user data for creation. The password is already hashed.
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Fields an administrator may change; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}
