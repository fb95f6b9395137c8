//! Represents a user's review of a car.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A review row joined with its author's username.
///
/// `car_id` and `user_id` are set by the handler at creation time and never
/// change afterwards.
#[derive(Clone, FromRow, Debug, PartialEq)]
pub struct Review {
    pub id: i64,

    pub car_id: i64,

    /// Authoring user.
    pub user_id: i64,

    /// Author display name, joined from `users.username`.
    pub username: String,

    pub rating: i64,

    pub comment: Option<String>,

    /// Set once on insert.
    pub created: DateTime<Utc>,

    /// Refreshed on every update.
    pub updated: DateTime<Utc>,
}

/// The caller-controlled part of a review; car and author come from the
/// request context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReview {
    pub rating: i64,
    pub comment: Option<String>,
}
