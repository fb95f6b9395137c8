//! Review input rules and read representation.

use crate::{
    models::review::{NewReview, Review},
    validation::{self, Field, ValidationErrors},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accepted rating range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewConfig {
    pub rating_min: i64,
    pub rating_max: i64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            rating_min: 1,
            rating_max: 5,
        }
    }
}

/// Client-supplied review fields. The car and the author are never read from
/// the body.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewInput {
    pub rating: Field<i64>,
    pub comment: Field<String>,
}

impl ReviewInput {
    pub fn merged_over(self, existing: &Review) -> Self {
        Self {
            rating: self.rating.or_else(|| Field::Present(existing.rating)),
            comment: self
                .comment
                .or_else(|| Field::from_option(existing.comment.clone())),
        }
    }

    pub fn validate(self, config: &ReviewConfig) -> Result<NewReview, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let comment = validation::optional_text(&mut errors, "comment", self.comment);
        let Some(rating) =
            validation::require(&mut errors, "rating", self.rating, "A valid integer is required.")
        else {
            return Err(errors);
        };
        if rating < config.rating_min {
            errors.add(
                "rating",
                format!(
                    "Ensure this value is greater than or equal to {}.",
                    config.rating_min
                ),
            );
        } else if rating > config.rating_max {
            errors.add(
                "rating",
                format!(
                    "Ensure this value is less than or equal to {}.",
                    config.rating_max
                ),
            );
        }

        errors.into_result()?;
        Ok(NewReview { rating, comment })
    }
}

/// Review as returned to clients: the parent car is implied by the URL and
/// omitted, the author is shown by username.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOut {
    pub id: i64,
    #[serde(rename = "apiUser")]
    pub api_user: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<Review> for ReviewOut {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            api_user: review.username,
            rating: review.rating,
            comment: review.comment,
            created: review.created,
            updated: review.updated,
        }
    }
}
