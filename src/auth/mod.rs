pub mod password;
pub mod roles;
pub mod session;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::Cookie;
use axum_extra::TypedHeader;
use diesel::prelude::*;

use crate::{
    error::AppError,
    models::{User, UserRole},
    schema::users::dsl,
    state::AppState,
};

use session::SESSION_COOKIE_NAME;

/// Resolved session user. Extracting this is the authentication gate:
/// missing/expired sessions and vanished users are 401, a blocked account
/// (can_authenticate = false) is 403 even though its sessions still resolve.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
}

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }

    pub fn role(&self) -> Result<UserRole, AppError> {
        UserRole::parse(&self.user.role)
            .ok_or_else(|| AppError::internal(format!("unknown stored role '{}'", self.user.role)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(cookies) = TypedHeader::<Cookie>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::unauthorized())?;

        let token = cookies
            .get(SESSION_COOKIE_NAME)
            .ok_or_else(AppError::unauthorized)?;

        let claims = state
            .sessions
            .get(token)
            .await
            .map_err(AppError::internal)?
            .ok_or_else(AppError::unauthorized)?;

        let mut conn = state.db()?;
        let user: Option<User> = dsl::users
            .find(claims.user_id)
            .first(&mut conn)
            .optional()?;

        let user = user.ok_or_else(AppError::unauthorized)?;

        if !user.can_authenticate {
            return Err(AppError::forbidden("account is blocked"));
        }

        Ok(CurrentUser { user })
    }
}
