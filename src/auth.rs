//! Token authentication.
//!
//! Callers present `Authorization: Token <key>` (or `Bearer <key>`). A request
//! without the header is anonymous; a header naming an unknown key is
//! rejected with 401 regardless of method.

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

/// An authenticated account, resolved from its access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
    /// The token that authenticated this request.
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(AuthUser),
}

impl Caller {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Caller::User(user) => Some(user),
            Caller::Anonymous => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.user().is_some_and(|u| u.is_staff)
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(key) = extract_token(&parts.headers)? else {
            return Ok(Caller::Anonymous);
        };

        let user = state
            .accounts
            .user_for_token(key)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid token."))?;

        tracing::debug!(user = user.id, "authenticated request");
        Ok(Caller::User(AuthUser {
            id: user.id,
            username: user.username,
            is_staff: user.is_staff,
            token: key.to_string(),
        }))
    }
}

/// Pull the token key out of the Authorization header.
///
/// Headers using another scheme are ignored, matching an anonymous request.
fn extract_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid token header."))?;

    let mut parts = header.split_whitespace();
    let scheme = parts.next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key)),
        (None, _) => Err(AppError::unauthorized(
            "Invalid token header. No credentials provided.",
        )),
        (Some(_), Some(_)) => Err(AppError::unauthorized(
            "Invalid token header. Token string should not contain spaces.",
        )),
    }
}
