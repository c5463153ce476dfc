use axum::extract::{Json, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::models::{Folder, NewFolder};
use crate::schema::folders;
use crate::state::AppState;

use super::to_iso;

#[derive(Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct FolderResponse {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: String,
}

/// Parent existence is not checked here; the foreign keys on the folders
/// table reject a dangling parent_id or case_id.
pub async fn create_folder(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateFolderRequest>,
) -> AppResult<(StatusCode, Json<FolderResponse>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let mut conn = state.db()?;

    let new_folder = NewFolder {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        parent_id: payload.parent_id,
        case_id: payload.case_id,
        created_by: Some(user.id()),
    };

    diesel::insert_into(folders::table)
        .values(&new_folder)
        .execute(&mut conn)?;

    let folder: Folder = folders::table.find(new_folder.id).first(&mut conn)?;
    info!(folder_id = %folder.id, name = %folder.name, "folder created");

    Ok((StatusCode::CREATED, Json(to_folder_response(folder))))
}

pub(super) fn to_folder_response(folder: Folder) -> FolderResponse {
    FolderResponse {
        id: folder.id,
        name: folder.name,
        parent_id: folder.parent_id,
        case_id: folder.case_id,
        created_by: folder.created_by,
        created_at: to_iso(folder.created_at),
    }
}
