//! AccountService — registration, credential checks and access tokens.
//!
//! Passwords are stored as Argon2 PHC strings. Token keys are random and
//! opaque; each user holds at most one, reused across logins until logout.

use crate::{
    models::user::{AuthToken, NewUser, User},
    services::{StoreError, StoreResult, is_unique_violation},
    validation::ValidationErrors,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, date_joined";

#[derive(Clone)]
pub struct AccountService {
    pub db: Arc<SqlitePool>,
}

impl AccountService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Create a regular account.
    ///
    /// Rejects an email or username that is already registered with a field
    /// error on that field.
    pub async fn register(&self, user: &NewUser) -> StoreResult<User> {
        self.insert_user(user, false).await
    }

    /// Create a staff account (used by `--create-admin`).
    pub async fn create_admin(&self, user: &NewUser) -> StoreResult<User> {
        self.insert_user(user, true).await
    }

    async fn insert_user(&self, user: &NewUser, is_staff: bool) -> StoreResult<User> {
        let email_taken = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)",
        )
        .bind(&user.email)
        .fetch_one(&*self.db)
        .await?;
        if email_taken != 0 {
            return Err(StoreError::Invalid(ValidationErrors::single(
                "email",
                "Email already exists.",
            )));
        }

        let password = user.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| StoreError::PasswordHash(e.to_string()))??;
        let inserted = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, is_staff, date_joined)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&password_hash)
        .bind(is_staff)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match inserted {
            Ok(created) => {
                info!(user = created.id, is_staff, "registered user");
                Ok(created)
            }
            Err(err) if is_unique_violation(&err) => Err(StoreError::Invalid(
                ValidationErrors::single("username", "A user with that username already exists."),
            )),
            Err(err) => Err(StoreError::Sqlx(err)),
        }
    }

    /// The user named `username` if `password` matches, otherwise `None`.
    pub async fn authenticate(&self, username: &str, password: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&*self.db)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        // Argon2 is CPU-bound; run it on the blocking pool.
        let password = password.to_owned();
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| StoreError::PasswordHash(e.to_string()))?;
        Ok(matches.then_some(user))
    }

    /// Return the user's token, creating one on first login.
    pub async fn get_or_create_token(&self, user_id: i64) -> StoreResult<AuthToken> {
        sqlx::query(
            "INSERT INTO auth_tokens (key, user_id, created) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(generate_key())
        .bind(user_id)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        let token = sqlx::query_as::<_, AuthToken>(
            "SELECT key, user_id, created FROM auth_tokens WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&*self.db)
        .await?;
        Ok(token)
    }

    /// Resolve a token key to its user.
    pub async fn user_for_token(&self, key: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.email, u.password_hash, u.is_staff, u.date_joined
             FROM auth_tokens t JOIN users u ON u.id = t.user_id
             WHERE t.key = ?",
        )
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;
        Ok(user)
    }

    /// Revoke a token. Later requests carrying it are unauthenticated.
    pub async fn delete_token(&self, key: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;
        debug!(revoked = result.rows_affected(), "deleted access token");
        Ok(())
    }
}

fn hash_password(password: &str) -> StoreResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!("stored password hash is unreadable: {}", err);
            false
        }
    }
}

/// 64 hex characters from two random UUIDs.
fn generate_key() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
