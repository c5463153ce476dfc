use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use axum_extra::{headers::Cookie, typed_header::TypedHeader};
use diesel::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::{password, session::SESSION_COOKIE_NAME, CurrentUser},
    error::{AppError, AppResult},
    models::User,
    schema::users::dsl,
    state::AppState,
};

use super::users::{set_online_status, to_user_response, UserResponse};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<UserResponse>)> {
    let mut conn = state.db()?;

    let user: Option<User> = dsl::users
        .filter(dsl::email.eq(&payload.email))
        .first(&mut conn)
        .optional()?;

    // Unknown email and wrong password are indistinguishable on purpose.
    let user = match user {
        Some(user) if password::verify_password(&payload.password, &user.password_hash)
            .unwrap_or(false) =>
        {
            user
        }
        _ => return Err(AppError::unauthorized()),
    };

    if !user.can_authenticate {
        return Err(AppError::forbidden("account is blocked"));
    }

    let mut extra = serde_json::Map::new();
    extra.insert("role".into(), serde_json::Value::String(user.role.clone()));
    let token = state
        .sessions
        .create(user.id, extra)
        .await
        .map_err(AppError::internal)?;

    set_online_status(&mut conn, user.id, true)?;
    let user: User = dsl::users.find(user.id).first(&mut conn)?;

    info!(user_id = %user.id, "user logged in");

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_session_cookie(&state, &token));

    Ok((headers, Json(to_user_response(user)?)))
}

pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, StatusCode)> {
    if let Some(TypedHeader(cookies)) = jar {
        if let Some(token) = cookies.get(SESSION_COOKIE_NAME) {
            // Idempotent: deleting an absent session is not an error.
            state
                .sessions
                .delete(token)
                .await
                .map_err(AppError::internal)?;
        }
    }

    let mut conn = state.db()?;
    set_online_status(&mut conn, user.id(), false)?;

    info!(user_id = %user.id(), "user logged out");

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_clear_session_cookie(&state));
    Ok((headers, StatusCode::NO_CONTENT))
}

pub async fn me(user: CurrentUser) -> AppResult<Json<UserResponse>> {
    Ok(Json(to_user_response(user.user)?))
}

fn build_session_cookie(state: &AppState, token: &str) -> HeaderValue {
    let max_age = state.sessions.ttl().as_secs();

    let mut parts = vec![format!("{SESSION_COOKIE_NAME}={token}")];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push(format!("Max-Age={max_age}"));
    if state.config.session_cookie_secure {
        parts.push("Secure".into());
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid session cookie")
}

fn build_clear_session_cookie(state: &AppState) -> HeaderValue {
    let mut parts = vec![format!("{SESSION_COOKIE_NAME}=")];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push("Max-Age=0".into());
    parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".into());
    if state.config.session_cookie_secure {
        parts.push("Secure".into());
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid session cookie")
}
