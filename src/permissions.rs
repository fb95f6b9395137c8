//! Access policies.
//!
//! Every handler states which [`Policy`] guards it and asks [`authorize`]
//! for a [`Decision`] given the caller, the action implied by the HTTP verb
//! and, for object-level checks, the owner of the resource.

use crate::{auth::Caller, errors::AppError};
use axum::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// GET, HEAD and OPTIONS.
    Read,
    Write,
}

impl From<&Method> for Action {
    fn from(method: &Method) -> Self {
        if *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS {
            Action::Read
        } else {
            Action::Write
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Reads are open; writes need a staff account.
    AdminOrReadOnly,
    /// Reads are open; writes need the resource's owner.
    OwnerOrReadOnly,
    /// Any authenticated account.
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No credentials were presented.
    Unauthenticated,
    Forbidden,
}

/// Decide whether `caller` may perform `action` under `policy`.
///
/// `owner` is the authoring user id for object-level policies and is ignored
/// otherwise.
pub fn authorize(policy: Policy, caller: &Caller, action: Action, owner: Option<i64>) -> Decision {
    let needs_user = match policy {
        Policy::Authenticated => true,
        Policy::AdminOrReadOnly | Policy::OwnerOrReadOnly => action == Action::Write,
    };
    if !needs_user {
        return Decision::Allow;
    }

    let Some(user) = caller.user() else {
        return Decision::Unauthenticated;
    };

    let allowed = match policy {
        Policy::Authenticated => true,
        Policy::AdminOrReadOnly => user.is_staff,
        Policy::OwnerOrReadOnly => owner == Some(user.id),
    };
    if allowed {
        Decision::Allow
    } else {
        Decision::Forbidden
    }
}

/// [`authorize`], turned into the matching HTTP error.
pub fn enforce(
    policy: Policy,
    caller: &Caller,
    action: Action,
    owner: Option<i64>,
) -> Result<(), AppError> {
    match authorize(policy, caller, action, owner) {
        Decision::Allow => Ok(()),
        Decision::Unauthenticated => Err(AppError::unauthorized(
            "Authentication credentials were not provided.",
        )),
        Decision::Forbidden => {
            tracing::info!(?policy, ?action, "permission denied");
            Err(AppError::forbidden(
                "You do not have permission to perform this action.",
            ))
        }
    }
}
