use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

use super::password::{compare_password, PasswordError};

/// Role every account receives when saved without one.
pub const BASE_ROLE: &str = "user";

/// Provider recorded for accounts created with an email/password signup.
pub const DEFAULT_PROVIDER: &str = "email";

/// User row as persisted in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash, never exposed in JSON
    pub is_email_verified: bool,
    pub provider: String,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub business_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub password_changed_at: Option<OffsetDateTime>,
    pub roles: Vec<String>,
    pub active: bool,
    #[serde(skip_serializing)]
    pub refresh_token: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Compares a plaintext candidate with this user's stored hash.
    pub fn compare_password(&self, candidate: &str) -> Result<bool, PasswordError> {
        compare_password(candidate, &self.password_hash)
    }
}

/// Columns carrying a unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UniqueField {
    Email,
    Username,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UniqueField::Email => "email",
            UniqueField::Username => "username",
        })
    }
}
