use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::{debug, warn};

use super::error::ApiError;
use crate::auth::{extract_token, AuthError};
use crate::shared_state::AppState;
use crate::store::AuthUser;

/// The caller, resolved from the request's access token. Rejects with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;

        match state.auth.authenticate(token).await {
            Ok(user) => Ok(Self(user)),
            Err(AuthError::Upstream(e)) => {
                warn!("Auth backend failed: {}", e);
                Err(ApiError::unauthorized())
            }
            Err(e) => {
                debug!("Authentication failed: {}", e);
                Err(ApiError::unauthorized())
            }
        }
    }
}

/// An authenticated caller listed in `ADMIN_USER_IDS`. Rejects with 401 or 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !state.config.is_admin(&user.id) {
            warn!("User {} requested an admin route", user.id);
            return Err(ApiError::forbidden());
        }
        Ok(Self(user))
    }
}
