//! Defines routes for cars, showrooms, reviews and accounts.
//!
//! ## Structure
//! - **Cars**
//!   - `GET|POST              /list`
//!   - `GET|PUT|PATCH|DELETE  /{id}`
//! - **Showrooms**
//!   - `GET|POST              /showroom`
//!   - `GET|PUT|PATCH|DELETE  /showroom/{id}`
//! - **Reviews**
//!   - `GET|POST              /{id}/reiview` — reviews of one car
//!   - `GET|POST              /reiview` — `?car=` filters, and is required to post
//!   - `GET|PUT|PATCH|DELETE  /reiview/{id}`
//! - **Accounts**: `POST /register/`, `POST /login/`, `POST /logout/`
//! - **Health**: `GET /healthz`, `GET /readyz`
//!
//! Static segments win over `/{id}`, so `/list` or `/showroom` never reach
//! the car item handlers.

use crate::{
    handlers::{
        car_handlers::{create_car, delete_car, get_car, list_cars, patch_car, update_car},
        health_handlers::{healthz, readyz},
        review_handlers::{
            create_car_review, create_review, delete_review, get_review, list_car_reviews,
            list_reviews, patch_review, update_review,
        },
        showroom_handlers::{
            create_showroom, delete_showroom, get_showroom, list_showrooms, patch_showroom,
            update_showroom,
        },
        user_handlers::{login, logout, register},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router for every endpoint. The caller attaches [`AppState`].
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // --- Accounts ---
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/logout/", post(logout))
        // --- Cars ---
        .route("/list", get(list_cars).post(create_car))
        .route(
            "/{id}",
            get(get_car)
                .put(update_car)
                .patch(patch_car)
                .delete(delete_car),
        )
        // --- Showrooms ---
        .route("/showroom", get(list_showrooms).post(create_showroom))
        .route(
            "/showroom/{id}",
            get(get_showroom)
                .put(update_showroom)
                .patch(patch_showroom)
                .delete(delete_showroom),
        )
        // --- Reviews ---
        .route("/{id}/reiview", get(list_car_reviews).post(create_car_review))
        .route("/reiview", get(list_reviews).post(create_review))
        .route(
            "/reiview/{id}",
            get(get_review)
                .put(update_review)
                .patch(patch_review)
                .delete(delete_review),
        )
}
