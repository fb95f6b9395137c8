//! Accounts and their access tokens.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A registered account. The password is only ever held as an Argon2 PHC
/// string.
#[derive(Clone, FromRow, Debug)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Staff accounts pass the admin-gated policy.
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// An opaque access token; at most one per user.
#[derive(Clone, FromRow, Debug)]
pub struct AuthToken {
    pub key: String,
    pub user_id: i64,
    pub created: DateTime<Utc>,
}

/// A validated registration. `password` is plaintext and must only be passed
/// on to the hasher.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}
