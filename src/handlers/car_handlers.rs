//! Car endpoints: `/list` (collection) and `/{id}` (item).
//! Reads are public, writes need a staff caller.

use crate::{
    auth::Caller,
    errors::AppError,
    models::car::Car,
    pagination::{CursorKey, Page, PageQuery, Plan},
    permissions::{Action, Policy, enforce},
    serializers::{
        car::{CarInput, CarOut},
        review::ReviewOut,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{Method, StatusCode},
};

/// GET `/list`
pub async fn list_cars(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<CarOut>>, AppError> {
    let total = state.catalog.count_cars().await?;
    let plan = Plan::new(&state.pagination, &q, total)?;
    let cars = state.catalog.list_cars(&plan.window()).await?;
    let rendered = render_cars(&state, cars).await?;
    Ok(Json(plan.finish(rendered, total, |c| CursorKey::by_id(c.id))))
}

/// POST `/list`
pub async fn create_car(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    payload: Result<Json<CarInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CarOut>), AppError> {
    enforce(Policy::AdminOrReadOnly, &caller, Action::from(&method), None)?;
    let Json(input) = payload?;
    let car = input.validate().map_err(AppError::validation)?;

    let created = state.catalog.create_car(&car).await?;
    tracing::info!(car = created.id, "car listed");
    Ok((StatusCode::CREATED, Json(CarOut::new(created, Vec::new()))))
}

/// GET `/{id}`
pub async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CarOut>, AppError> {
    let car = state.catalog.get_car(id).await?;
    let mut rendered = render_cars(&state, vec![car]).await?;
    rendered
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::internal("rendering car produced no output"))
}

/// PUT `/{id}`
///
/// Every writable field must be present.
pub async fn update_car(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
    payload: Result<Json<CarInput>, JsonRejection>,
) -> Result<Json<CarOut>, AppError> {
    write_car(state, caller, method, id, payload, false).await
}

/// PATCH `/{id}`
///
/// Omitted fields keep their stored values.
pub async fn patch_car(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
    payload: Result<Json<CarInput>, JsonRejection>,
) -> Result<Json<CarOut>, AppError> {
    write_car(state, caller, method, id, payload, true).await
}

/// DELETE `/{id}`
///
/// The car's reviews go with it.
pub async fn delete_car(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    enforce(Policy::AdminOrReadOnly, &caller, Action::from(&method), None)?;
    state.catalog.delete_car(id).await?;
    tracing::info!(car = id, "car deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn write_car(
    state: AppState,
    caller: Caller,
    method: Method,
    id: i64,
    payload: Result<Json<CarInput>, JsonRejection>,
    partial: bool,
) -> Result<Json<CarOut>, AppError> {
    enforce(Policy::AdminOrReadOnly, &caller, Action::from(&method), None)?;
    let existing = state.catalog.get_car(id).await?;
    let Json(input) = payload?;
    let input = if partial {
        input.merged_over(&existing)
    } else {
        input
    };
    let car = input.validate().map_err(AppError::validation)?;

    let updated = state.catalog.update_car(id, &car).await?;
    let mut rendered = render_cars(&state, vec![updated]).await?;
    rendered
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::internal("rendering car produced no output"))
}

/// Attach each car's reviews and compute the read-only fields.
pub(crate) async fn render_cars(state: &AppState, cars: Vec<Car>) -> Result<Vec<CarOut>, AppError> {
    let ids: Vec<i64> = cars.iter().map(|c| c.id).collect();
    let mut reviews = state.reviews.by_cars(&ids).await?;
    Ok(cars
        .into_iter()
        .map(|car| {
            let nested = reviews
                .remove(&car.id)
                .unwrap_or_default()
                .into_iter()
                .map(ReviewOut::from)
                .collect();
            CarOut::new(car, nested)
        })
        .collect())
}
