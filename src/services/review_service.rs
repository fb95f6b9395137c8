//! ReviewService — reviews, always read joined with their author's username.

use crate::{
    models::review::{NewReview, Review},
    pagination::Window,
    services::{StoreError, StoreResult, not_found},
};
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

const REVIEW_SELECT: &str = "SELECT r.id, r.car_id, r.user_id, u.username, r.rating, r.comment, \
     r.created, r.updated FROM reviews r JOIN users u ON u.id = r.user_id";

#[derive(Clone)]
pub struct ReviewService {
    pub db: Arc<SqlitePool>,
}

impl ReviewService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Count reviews, optionally only those of `car_id`.
    pub async fn count(&self, car_id: Option<i64>) -> StoreResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM reviews");
        if let Some(car_id) = car_id {
            builder.push(" WHERE car_id = ");
            builder.push_bind(car_id);
        }
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&*self.db)
            .await?;
        Ok(count)
    }

    /// One page of reviews ordered by creation time, then id.
    pub async fn list(&self, car_id: Option<i64>, window: &Window) -> StoreResult<Vec<Review>> {
        let mut builder = QueryBuilder::<Sqlite>::new(REVIEW_SELECT);
        builder.push(" WHERE 1 = 1");
        if let Some(car_id) = car_id {
            builder.push(" AND r.car_id = ");
            builder.push_bind(car_id);
        }
        if let Some(after) = &window.after {
            match after.created {
                Some(created) => {
                    builder.push(" AND (r.created > ");
                    builder.push_bind(created);
                    builder.push(" OR (r.created = ");
                    builder.push_bind(created);
                    builder.push(" AND r.id > ");
                    builder.push_bind(after.id);
                    builder.push("))");
                }
                None => {
                    builder.push(" AND r.id > ");
                    builder.push_bind(after.id);
                }
            }
        }
        builder.push(" ORDER BY r.created ASC, r.id ASC LIMIT ");
        builder.push_bind(window.limit);
        builder.push(" OFFSET ");
        builder.push_bind(window.offset);

        let reviews = builder
            .build_query_as::<Review>()
            .fetch_all(&*self.db)
            .await?;
        Ok(reviews)
    }

    /// Reviews for each of `car_ids`, oldest first, for nesting in car reads.
    pub async fn by_cars(&self, car_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<Review>>> {
        let mut grouped: HashMap<i64, Vec<Review>> = HashMap::new();
        if car_ids.is_empty() {
            return Ok(grouped);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(REVIEW_SELECT);
        builder.push(" WHERE r.car_id IN (");
        let mut ids = builder.separated(", ");
        for id in car_ids {
            ids.push_bind(*id);
        }
        builder.push(") ORDER BY r.created ASC, r.id ASC");

        let reviews = builder
            .build_query_as::<Review>()
            .fetch_all(&*self.db)
            .await?;
        for review in reviews {
            grouped.entry(review.car_id).or_default().push(review);
        }
        Ok(grouped)
    }

    pub async fn get(&self, id: i64) -> StoreResult<Review> {
        sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = ?"))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(not_found("Review", id))
    }

    /// Whether `user_id` already reviewed `car_id`.
    pub async fn exists_for(&self, car_id: i64, user_id: i64) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE car_id = ? AND user_id = ?)",
        )
        .bind(car_id)
        .bind(user_id)
        .fetch_one(&*self.db)
        .await?;
        Ok(exists != 0)
    }

    /// Insert a review; `created` and `updated` both start at now.
    pub async fn create(&self, car_id: i64, user_id: i64, review: &NewReview) -> StoreResult<Review> {
        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO reviews (car_id, user_id, rating, comment, created, updated)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(car_id)
        .bind(user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        debug!(review = id, car = car_id, user = user_id, "created review");
        self.get(id).await
    }

    /// Overwrite rating and comment; car and author never change.
    pub async fn update(&self, id: i64, review: &NewReview) -> StoreResult<Review> {
        let result = sqlx::query("UPDATE reviews SET rating = ?, comment = ?, updated = ? WHERE id = ?")
            .bind(review.rating)
            .bind(&review.comment)
            .bind(Utc::now())
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Review",
                id,
            });
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Review",
                id,
            });
        }
        Ok(())
    }
}
