use anyhow::{Context, Result};
use diesel::prelude::*;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::config::AppConfig;
use crate::models::{NewUser, UserRole};
use crate::schema::users;

/// Creates the initial admin account when none exists. A no-op when an
/// admin is already present or no admin credentials are configured.
pub fn ensure_first_admin(conn: &mut PgConnection, config: &AppConfig) -> Result<()> {
    let admin_exists: Option<Uuid> = users::table
        .filter(users::role.eq(UserRole::Admin.as_str()))
        .select(users::id)
        .first(conn)
        .optional()
        .context("failed to check for existing admin")?;

    if admin_exists.is_some() {
        return Ok(());
    }

    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        info!("no admin account exists and ADMIN_EMAIL/ADMIN_PASSWORD are unset, skipping bootstrap");
        return Ok(());
    };

    let new_admin = NewUser {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash: hash_password(password)?,
        role: UserRole::Admin.as_str().to_string(),
        full_name: config.admin_full_name.clone(),
        specialization: None,
        settings: json!({}),
        can_authenticate: true,
    };

    diesel::insert_into(users::table)
        .values(&new_admin)
        .execute(conn)
        .context("failed to create initial admin")?;

    info!(email = %email, "initial admin account created");
    Ok(())
}
