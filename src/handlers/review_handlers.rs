//! Review endpoints.
//!
//! Collections live at `/{car_id}/reiview` and `/reiview`; single reviews at
//! `/reiview/{id}`. Listing and detail reads are throttled per user.

use crate::{
    auth::Caller,
    errors::AppError,
    pagination::{CursorKey, Page, PageQuery, Plan},
    permissions::{Action, Policy, enforce},
    serializers::review::{ReviewInput, ReviewOut},
    state::AppState,
    throttle::ThrottleScope,
    validation::ValidationErrors,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{Method, StatusCode},
};
use serde::Deserialize;

/// `?car=` on the top-level review collection.
#[derive(Debug, Default, Deserialize)]
pub struct CarFilter {
    pub car: Option<i64>,
}

/// GET `/reiview`
pub async fn list_reviews(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Query(filter): Query<CarFilter>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<ReviewOut>>, AppError> {
    enforce(Policy::AdminOrReadOnly, &caller, Action::from(&method), None)?;
    state.throttle.allow(ThrottleScope::ReviewList, &caller)?;
    if let Some(car_id) = filter.car {
        state.catalog.get_car(car_id).await?;
    }
    let mut page = page_of_reviews(&state, filter.car, &q).await?;
    if let Some(car_id) = filter.car {
        page = page.keep_param("car", car_id);
    }
    Ok(Json(page))
}

/// GET `/{car_id}/reiview`
pub async fn list_car_reviews(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(car_id): Path<i64>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<ReviewOut>>, AppError> {
    enforce(Policy::AdminOrReadOnly, &caller, Action::from(&method), None)?;
    state.throttle.allow(ThrottleScope::ReviewList, &caller)?;
    state.catalog.get_car(car_id).await?;
    page_of_reviews(&state, Some(car_id), &q).await.map(Json)
}

/// POST `/reiview?car={car_id}`
pub async fn create_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Query(filter): Query<CarFilter>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewOut>), AppError> {
    enforce(Policy::Authenticated, &caller, Action::from(&method), None)?;
    let Some(car_id) = filter.car else {
        return Err(AppError::validation(ValidationErrors::single(
            "car",
            "This query parameter is required.",
        )));
    };
    write_new_review(&state, &caller, car_id, payload).await
}

/// POST `/{car_id}/reiview`
pub async fn create_car_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(car_id): Path<i64>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewOut>), AppError> {
    enforce(Policy::Authenticated, &caller, Action::from(&method), None)?;
    write_new_review(&state, &caller, car_id, payload).await
}

/// GET `/reiview/{id}`
pub async fn get_review(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<ReviewOut>, AppError> {
    state.throttle.allow(ThrottleScope::ReviewDetail, &caller)?;
    let review = state.reviews.get(id).await?;
    Ok(Json(ReviewOut::from(review)))
}

/// PUT `/reiview/{id}`
pub async fn update_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<Json<ReviewOut>, AppError> {
    write_review(state, caller, method, id, payload, false).await
}

/// PATCH `/reiview/{id}`
pub async fn patch_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<Json<ReviewOut>, AppError> {
    write_review(state, caller, method, id, payload, true).await
}

/// DELETE `/reiview/{id}`
pub async fn delete_review(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.throttle.allow(ThrottleScope::ReviewDetail, &caller)?;
    let review = state.reviews.get(id).await?;
    enforce(
        Policy::OwnerOrReadOnly,
        &caller,
        Action::from(&method),
        Some(review.user_id),
    )?;
    state.reviews.delete(id).await?;
    tracing::info!(review = id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn page_of_reviews(
    state: &AppState,
    car_id: Option<i64>,
    q: &PageQuery,
) -> Result<Page<ReviewOut>, AppError> {
    let total = state.reviews.count(car_id).await?;
    let plan = Plan::new(&state.pagination, q, total)?;
    let reviews = state.reviews.list(car_id, &plan.window()).await?;
    let page = plan
        .finish(reviews, total, |r| CursorKey {
            created: Some(r.created),
            id: r.id,
        })
        .map(ReviewOut::from);
    Ok(page)
}

/// Shared tail of both create routes: the caller authors a review of
/// `car_id`, at most one per car.
async fn write_new_review(
    state: &AppState,
    caller: &Caller,
    car_id: i64,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewOut>), AppError> {
    let Some(user) = caller.user() else {
        return Err(AppError::unauthorized(
            "Authentication credentials were not provided.",
        ));
    };
    let Json(input) = payload?;
    let review = input
        .validate(&state.review_rules)
        .map_err(AppError::validation)?;

    state.catalog.get_car(car_id).await?;
    if state.reviews.exists_for(car_id, user.id).await? {
        let mut errors = ValidationErrors::new();
        errors.add_non_field("You have already reviewed this car.");
        return Err(AppError::validation(errors));
    }

    let created = state.reviews.create(car_id, user.id, &review).await?;
    tracing::info!(review = created.id, car = car_id, user = user.id, "review posted");
    Ok((StatusCode::CREATED, Json(ReviewOut::from(created))))
}

async fn write_review(
    state: AppState,
    caller: Caller,
    method: Method,
    id: i64,
    payload: Result<Json<ReviewInput>, JsonRejection>,
    partial: bool,
) -> Result<Json<ReviewOut>, AppError> {
    state.throttle.allow(ThrottleScope::ReviewDetail, &caller)?;
    let existing = state.reviews.get(id).await?;
    enforce(
        Policy::OwnerOrReadOnly,
        &caller,
        Action::from(&method),
        Some(existing.user_id),
    )?;
    let Json(input) = payload?;
    let input = if partial {
        input.merged_over(&existing)
    } else {
        input
    };
    let review = input
        .validate(&state.review_rules)
        .map_err(AppError::validation)?;

    let updated = state.reviews.update(id, &review).await?;
    Ok(Json(ReviewOut::from(updated)))
}
