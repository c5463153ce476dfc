use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{password, roles, CurrentUser};
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, NewUserEmailConfig, User, UserRole};
use crate::schema::{user_email_configs, users};
use crate::state::AppState;

use super::to_iso;

#[derive(Deserialize)]
pub struct EmailConfigInput {
    pub smtp_host: String,
    pub smtp_port: i32,
    pub smtp_user: String,
    /// Ciphertext produced by the operator tooling; stored verbatim.
    pub smtp_password_encrypted: String,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub full_name: String,
    pub specialization: Option<String>,
    pub settings: Option<serde_json::Value>,
    pub email_config: Option<EmailConfigInput>,
}

#[derive(Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAccessRequest {
    pub can_authenticate: bool,
}

/// User view. Never carries the password hash or SMTP secrets.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub full_name: String,
    pub specialization: Option<String>,
    pub settings: serde_json::Value,
    pub can_authenticate: bool,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    creator: CurrentUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let creator_role = creator.role()?;
    if !roles::can_create(creator_role, payload.role) {
        return Err(AppError::forbidden(format!(
            "role {} cannot create users with role {}",
            creator_role.as_str(),
            payload.role.as_str()
        )));
    }

    let mut conn = state.db()?;

    let existing: Option<Uuid> = users::table
        .filter(users::email.eq(&payload.email))
        .select(users::id)
        .first(&mut conn)
        .optional()?;
    if existing.is_some() {
        return Err(AppError::conflict("email is already registered"));
    }

    let password_hash = password::hash_password(&payload.password).map_err(AppError::internal)?;

    let user_id = conn.transaction::<Uuid, AppError, _>(|conn| {
        let new_user = NewUser {
            id: Uuid::new_v4(),
            email: payload.email.clone(),
            password_hash,
            role: payload.role.as_str().to_string(),
            full_name: payload.full_name.clone(),
            specialization: payload.specialization.clone(),
            settings: payload
                .settings
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            can_authenticate: true,
        };
        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(conn)?;

        if let Some(config) = &payload.email_config {
            let new_config = NewUserEmailConfig {
                id: Uuid::new_v4(),
                user_id: new_user.id,
                smtp_host: config.smtp_host.clone(),
                smtp_port: config.smtp_port,
                smtp_user: config.smtp_user.clone(),
                smtp_password_encrypted: config.smtp_password_encrypted.clone(),
            };
            diesel::insert_into(user_email_configs::table)
                .values(&new_config)
                .execute(conn)?;
        }

        Ok(new_user.id)
    })?;

    let user: User = users::table.find(user_id).first(&mut conn)?;
    info!(user_id = %user.id, role = %user.role, created_by = %creator.id(), "user created");

    Ok((StatusCode::CREATED, Json(to_user_response(user)?)))
}

pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<UserListQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let allowed = roles::manageable_roles(current.role()?);
    if allowed.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let mut conn = state.db()?;

    let allowed_values: Vec<String> = allowed.iter().map(|r| r.as_str().to_string()).collect();
    let mut query = users::table
        .filter(users::role.eq_any(allowed_values))
        .into_boxed();

    if let Some(role) = params.role {
        query = query.filter(users::role.eq(role.as_str()));
    }
    if let Some(is_active) = params.is_active {
        query = query.filter(users::is_active.eq(is_active));
    }
    if let Some(search) = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let pattern = format!("%{search}%");
        query = query.filter(
            users::full_name
                .ilike(pattern.clone())
                .or(users::email.ilike(pattern)),
        );
    }

    let descending = !matches!(params.order.as_deref(), Some("asc"));
    query = order_users(query, params.sort_by.as_deref(), descending);

    let rows: Vec<User> = query.load(&mut conn)?;
    let response = rows
        .into_iter()
        .map(to_user_response)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(response))
}

pub async fn update_access(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateAccessRequest>,
) -> AppResult<Json<UserResponse>> {
    let mut conn = state.db()?;

    let target: Option<User> = users::table.find(user_id).first(&mut conn).optional()?;
    let target = target.ok_or_else(AppError::not_found)?;

    let target_role = UserRole::parse(&target.role)
        .ok_or_else(|| AppError::internal(format!("unknown stored role '{}'", target.role)))?;
    if !roles::manageable_roles(current.role()?).contains(&target_role) {
        return Err(AppError::forbidden("you cannot manage this user"));
    }

    diesel::update(users::table.find(user_id))
        .set(users::can_authenticate.eq(payload.can_authenticate))
        .execute(&mut conn)?;

    let user: User = users::table.find(user_id).first(&mut conn)?;
    info!(
        user_id = %user.id,
        can_authenticate = user.can_authenticate,
        changed_by = %current.id(),
        "user access toggled"
    );

    Ok(Json(to_user_response(user)?))
}

fn order_users(
    query: users::BoxedQuery<'static, Pg>,
    sort_by: Option<&str>,
    descending: bool,
) -> users::BoxedQuery<'static, Pg> {
    match (sort_by, descending) {
        (Some("full_name"), false) => query.order(users::full_name.asc()),
        (Some("full_name"), true) => query.order(users::full_name.desc()),
        (Some("email"), false) => query.order(users::email.asc()),
        (Some("email"), true) => query.order(users::email.desc()),
        (Some("last_login"), false) => query.order(users::last_login.asc()),
        (Some("last_login"), true) => query.order(users::last_login.desc()),
        (_, false) => query.order(users::created_at.asc()),
        (_, true) => query.order(users::created_at.desc()),
    }
}

/// Marks a user online or offline; going online also stamps last_login.
pub(super) fn set_online_status(
    conn: &mut PgConnection,
    user_id: Uuid,
    online: bool,
) -> AppResult<()> {
    if online {
        diesel::update(users::table.find(user_id))
            .set((
                users::is_active.eq(true),
                users::last_login.eq(Some(Utc::now().naive_utc())),
            ))
            .execute(conn)?;
    } else {
        diesel::update(users::table.find(user_id))
            .set(users::is_active.eq(false))
            .execute(conn)?;
    }
    Ok(())
}

pub(super) fn to_user_response(user: User) -> AppResult<UserResponse> {
    let role = UserRole::parse(&user.role)
        .ok_or_else(|| AppError::internal(format!("unknown stored role '{}'", user.role)))?;

    Ok(UserResponse {
        id: user.id,
        email: user.email,
        role,
        full_name: user.full_name,
        specialization: user.specialization,
        settings: user.settings,
        can_authenticate: user.can_authenticate,
        is_active: user.is_active,
        last_login: user.last_login.map(to_iso),
        created_at: to_iso(user.created_at),
    })
}
