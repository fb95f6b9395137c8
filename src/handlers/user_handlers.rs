//! Account endpoints: `/register/`, `/login/` and `/logout/`.

use crate::{
    auth::Caller,
    errors::AppError,
    permissions::{Action, Policy, enforce},
    serializers::user::{LoginInput, RegisterInput, RegisteredUser, TokenOut},
    state::AppState,
    validation::ValidationErrors,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{Method, StatusCode},
};
use serde_json::{Value, json};

/// POST `/register/`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisteredUser>), AppError> {
    let Json(input) = payload?;
    let new_user = input.validate().map_err(AppError::validation)?;
    let user = state.accounts.register(&new_user).await?;
    Ok((StatusCode::CREATED, Json(RegisteredUser::from(user))))
}

/// POST `/login/`
///
/// Exchanges credentials for the caller's token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<TokenOut>, AppError> {
    let Json(input) = payload?;
    let (username, password) = input.validate().map_err(AppError::validation)?;

    let Some(user) = state.accounts.authenticate(&username, &password).await? else {
        tracing::info!(%username, "login refused");
        let mut errors = ValidationErrors::new();
        errors.add_non_field("Unable to log in with provided credentials.");
        return Err(AppError::validation(errors));
    };

    let token = state.accounts.get_or_create_token(user.id).await?;
    tracing::info!(user = user.id, "logged in");
    Ok(Json(TokenOut { token: token.key }))
}

/// POST `/logout/`
///
/// Revokes the token used for this request.
pub async fn logout(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
) -> Result<Json<Value>, AppError> {
    enforce(Policy::Authenticated, &caller, Action::from(&method), None)?;
    if let Some(user) = caller.user() {
        state.accounts.delete_token(&user.token).await?;
        tracing::info!(user = user.id, "logged out");
    }
    Ok(Json(json!({ "message": "Successfully logged out." })))
}
