use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::{
    auth::repo_types::{Access, User},
    error::AppError,
    state::AppState,
};

/// Any active, authenticated user.
pub struct CurrentUser(pub User);

/// An active user holding the admin role.
pub struct AdminUser(pub User);

/// Pulls the token out of `Authorization: Bearer <token>`. The scheme is case-insensitive.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Resolves the request's bearer token to an active user and checks `required`.
///
/// Missing/invalid/expired tokens and unknown or inactive users are all
/// `Unauthenticated`; a valid user below the required role is `Forbidden`.
/// Store faults propagate as internal errors.
pub async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    required: Access,
) -> Result<User, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthenticated)?;

    let email = state.keys.verify(token).map_err(|_| {
        debug!("bearer token rejected");
        AppError::Unauthenticated
    })?;

    let user = match state.users.find_by_email(&email).await? {
        Some(u) if u.is_active => u,
        Some(u) => {
            warn!(user_id = %u.id, "token presented for inactive user");
            return Err(AppError::Unauthenticated);
        }
        None => {
            warn!("token subject has no user");
            return Err(AppError::Unauthenticated);
        }
    };

    if !user.can(required) {
        warn!(user_id = %user.id, role = user.role.as_str(), ?required, "access denied");
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authorize(state, &parts.headers, Access::Member).await.map(CurrentUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authorize(state, &parts.headers, Access::Admin).await.map(AdminUser)
    }
}
