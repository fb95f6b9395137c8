//! Showroom endpoints: `/showroom` and `/showroom/{id}`.

use crate::{
    auth::Caller,
    errors::AppError,
    models::showroom::Showroom,
    pagination::{CursorKey, Page, PageQuery, Plan},
    permissions::{Action, Policy, enforce},
    serializers::showroom::{ShowroomInput, ShowroomOut},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{Method, StatusCode},
};

/// GET `/showroom`
pub async fn list_showrooms(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<ShowroomOut>>, AppError> {
    let total = state.catalog.count_showrooms().await?;
    let plan = Plan::new(&state.pagination, &q, total)?;
    let showrooms = state.catalog.list_showrooms(&plan.window()).await?;
    let rendered = render_showrooms(&state, showrooms).await?;
    Ok(Json(plan.finish(rendered, total, |s| CursorKey::by_id(s.id))))
}

/// POST `/showroom`
pub async fn create_showroom(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    payload: Result<Json<ShowroomInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ShowroomOut>), AppError> {
    enforce(Policy::AdminOrReadOnly, &caller, Action::from(&method), None)?;
    let Json(input) = payload?;
    let showroom = input.validate().map_err(AppError::validation)?;

    let created = state.catalog.create_showroom(&showroom).await?;
    tracing::info!(showroom = created.id, "showroom opened");
    Ok((StatusCode::CREATED, Json(ShowroomOut::new(created, &[]))))
}

/// GET `/showroom/{id}`
pub async fn get_showroom(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ShowroomOut>, AppError> {
    let showroom = state.catalog.get_showroom(id).await?;
    render_one(&state, showroom).await.map(Json)
}

/// PUT `/showroom/{id}`
pub async fn update_showroom(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
    payload: Result<Json<ShowroomInput>, JsonRejection>,
) -> Result<Json<ShowroomOut>, AppError> {
    write_showroom(state, caller, method, id, payload, false).await
}

/// PATCH `/showroom/{id}`
pub async fn patch_showroom(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
    payload: Result<Json<ShowroomInput>, JsonRejection>,
) -> Result<Json<ShowroomOut>, AppError> {
    write_showroom(state, caller, method, id, payload, true).await
}

/// DELETE `/showroom/{id}`
///
/// Every car in the showroom is deleted too.
pub async fn delete_showroom(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    enforce(Policy::AdminOrReadOnly, &caller, Action::from(&method), None)?;
    state.catalog.delete_showroom(id).await?;
    tracing::info!(showroom = id, "showroom closed");
    Ok(StatusCode::NO_CONTENT)
}

async fn write_showroom(
    state: AppState,
    caller: Caller,
    method: Method,
    id: i64,
    payload: Result<Json<ShowroomInput>, JsonRejection>,
    partial: bool,
) -> Result<Json<ShowroomOut>, AppError> {
    enforce(Policy::AdminOrReadOnly, &caller, Action::from(&method), None)?;
    let existing = state.catalog.get_showroom(id).await?;
    let Json(input) = payload?;
    let input = if partial {
        input.merged_over(&existing)
    } else {
        input
    };
    let showroom = input.validate().map_err(AppError::validation)?;

    let updated = state.catalog.update_showroom(id, &showroom).await?;
    render_one(&state, updated).await.map(Json)
}

async fn render_showrooms(
    state: &AppState,
    showrooms: Vec<Showroom>,
) -> Result<Vec<ShowroomOut>, AppError> {
    let ids: Vec<i64> = showrooms.iter().map(|s| s.id).collect();
    let cars = state.catalog.car_ids_by_showroom(&ids).await?;
    Ok(showrooms
        .into_iter()
        .map(|s| {
            let car_ids = cars.get(&s.id).map(Vec::as_slice).unwrap_or(&[]);
            ShowroomOut::new(s, car_ids)
        })
        .collect())
}

async fn render_one(state: &AppState, showroom: Showroom) -> Result<ShowroomOut, AppError> {
    let cars = state.catalog.car_ids_by_showroom(&[showroom.id]).await?;
    let car_ids = cars.get(&showroom.id).map(Vec::as_slice).unwrap_or(&[]);
    Ok(ShowroomOut::new(showroom, car_ids))
}
