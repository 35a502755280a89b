use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use super::cookie::token_from_headers;
use crate::{error::ApiError, state::AppState};

/// Identity of the caller, placed in request extensions by [`require_session`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Gate for protected routes. Without a valid session cookie for an existing
/// user the request ends here with 401.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(request.headers(), &state.config.cookie.name).ok_or_else(|| {
        warn!("missing session cookie");
        ApiError::Unauthorized
    })?;

    let claims = state.jwt.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired session token");
        ApiError::Unauthorized
    })?;

    if state.users.find_by_id(claims.sub).await?.is_none() {
        warn!(user_id = %claims.sub, "session for unknown user");
        return Err(ApiError::Unauthorized);
    }

    request.extensions_mut().insert(AuthUser { id: claims.sub });
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(ApiError::Unauthorized)
    }
}
