//! Persistence services, one per entity family, all sharing the SQLite pool.

pub mod account_service;
pub mod catalog_service;
pub mod review_service;

use crate::validation::ValidationErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// A write rejected by a rule that needs the database to check.
    #[error("invalid input: {0:?}")]
    Invalid(ValidationErrors),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Turn `RowNotFound` into a typed not-found for `entity`.
pub(crate) fn not_found(entity: &'static str, id: i64) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| match err {
        sqlx::Error::RowNotFound => StoreError::NotFound { entity, id },
        other => StoreError::Sqlx(other),
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
