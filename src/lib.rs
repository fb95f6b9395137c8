//! Car listings, showrooms and user reviews over a JSON HTTP API.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod routes;
pub mod serializers;
pub mod services;
pub mod state;
pub mod throttle;
pub mod validation;

use axum::Router;
use state::AppState;

/// The full application with its state attached.
pub fn app(state: AppState) -> Router {
    routes::routes::routes().with_state(state)
}
