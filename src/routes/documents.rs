use std::path::Path as FsPath;
use std::time::Duration;

use axum::extract::{Json, Multipart, Path, Query, State};
use axum::http::StatusCode;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::models::{Document, Folder, NewDocument};
use crate::schema::{documents, folders};
use crate::state::AppState;

use super::to_iso;

const PRESIGNED_URL_EXPIRY_SECONDS: u64 = 3600;
const STORAGE_NAMESPACE: &str = "documents";
const FALLBACK_MIME: &str = "application/octet-stream";

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct DocumentListQuery {
    pub case_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct BrowseQuery {
    pub folder_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub case_id: Option<Uuid>,
    pub folder_id: Option<Uuid>,
    pub title: String,
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_extension: String,
    pub version: i32,
    pub is_archived: bool,
    pub uploaded_by: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Folder,
    File,
}

/// One row of the unified folder/document view. Folders carry no size or
/// extension; documents carry no child namespace.
#[derive(Serialize)]
pub struct FileSystemEntry {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct DocumentDownloadResponse {
    pub download_url: String,
    pub expires_in: u64,
}

pub async fn upload_document(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut case_id: Option<Uuid> = None;
    let mut folder_id: Option<Uuid> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                original_filename = field.file_name().map(|n| n.to_string());
                content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read file bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                file_bytes = Some(data.to_vec());
            }
            Some("case_id") => {
                case_id = parse_uuid_field(field, "case_id").await?;
            }
            Some("folder_id") => {
                folder_id = parse_uuid_field(field, "folder_id").await?;
            }
            Some("title") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid title: {err}")))?;
                let trimmed = value.trim().to_string();
                if !trimmed.is_empty() {
                    title = Some(trimmed);
                }
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::bad_request("file field is required"))?;
    let original_filename =
        original_filename.ok_or_else(|| AppError::bad_request("filename is required"))?;

    let extension = file_extension(&original_filename);
    let mime_type = content_type
        .filter(|ct| !ct.trim().is_empty())
        .or_else(|| {
            mime_guess::from_path(&original_filename)
                .first_raw()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| FALLBACK_MIME.to_string());

    let doc_id = Uuid::new_v4();
    let storage_key = build_storage_key(case_id, &extension);
    let file_size = bytes.len() as i64;

    // Blob first, row second: a failed insert leaves an orphaned blob,
    // never a row pointing at missing bytes.
    state
        .storage
        .put_object(&storage_key, bytes, &mime_type)
        .await
        .map_err(|err| {
            error!(error = %err, key = %storage_key, "failed to store document blob");
            AppError::internal(format!("failed to store document: {err}"))
        })?;

    let new_document = NewDocument {
        id: doc_id,
        case_id,
        folder_id,
        title: title.unwrap_or_else(|| original_filename.clone()),
        original_filename: original_filename.clone(),
        storage_key,
        file_size,
        mime_type,
        file_extension: extension,
        version: 1,
        uploaded_by: Some(user.id()),
    };

    let mut conn = state.db()?;
    diesel::insert_into(documents::table)
        .values(&new_document)
        .execute(&mut conn)?;

    let document: Document = documents::table.find(doc_id).first(&mut conn)?;
    info!(
        document_id = %document.id,
        original_filename = %document.original_filename,
        file_size = document.file_size,
        "document uploaded"
    );

    Ok((StatusCode::CREATED, Json(to_document_response(document))))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<DocumentListQuery>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let (limit, offset) = validate_page_window(params.limit, params.offset)?;
    let descending = !matches!(params.order.as_deref(), Some("asc"));

    let mut conn = state.db()?;

    let mut query = documents::table.into_boxed();
    if let Some(case_id) = params.case_id {
        query = query.filter(documents::case_id.eq(case_id));
    }
    if let Some(search) = normalized_search(params.search.as_deref()) {
        query = query.filter(documents::title.ilike(format!("%{search}%")));
    }

    query = order_documents(query, params.sort_by.as_deref(), descending);

    let rows: Vec<Document> = query.limit(limit).offset(offset).load(&mut conn)?;
    Ok(Json(rows.into_iter().map(to_document_response).collect()))
}

/// Unified listing: folders and documents fetched independently under the
/// same predicate, each with its own sort and page window, folders first.
/// A page can therefore hold up to twice `limit` entries; that mirrors the
/// two underlying collections rather than a single global cursor.
pub async fn browse(
    State(state): State<AppState>,
    Query(params): Query<BrowseQuery>,
) -> AppResult<Json<Vec<FileSystemEntry>>> {
    let (limit, offset) = validate_page_window(params.limit, params.offset)?;
    let descending = !matches!(params.order.as_deref(), Some("asc"));
    let search = normalized_search(params.search.as_deref());
    let sort_by = params.sort_by.clone();

    let folder_state = state.clone();
    let folder_filters = (params.folder_id, params.case_id, search.clone(), sort_by.clone());
    let folder_task = tokio::task::spawn_blocking(move || -> AppResult<Vec<Folder>> {
        let (folder_id, case_id, search, sort_by) = folder_filters;
        let mut conn = folder_state.db()?;

        let mut query = folders::table.into_boxed();
        match &search {
            Some(search) => {
                query = query.filter(folders::name.ilike(format!("%{search}%")));
            }
            None => {
                query = match folder_id {
                    Some(folder_id) => query.filter(folders::parent_id.eq(folder_id)),
                    None => query.filter(folders::parent_id.is_null()),
                };
            }
        }
        if let Some(case_id) = case_id {
            query = query.filter(folders::case_id.eq(case_id));
        }

        // Folders only know name and created_at; anything else falls back.
        query = match (sort_by.as_deref(), descending) {
            (Some("name"), false) => query.order(folders::name.asc()),
            (Some("name"), true) => query.order(folders::name.desc()),
            (_, false) => query.order(folders::created_at.asc()),
            (_, true) => query.order(folders::created_at.desc()),
        };

        Ok(query.limit(limit).offset(offset).load(&mut conn)?)
    });

    let doc_state = state.clone();
    let doc_filters = (params.folder_id, params.case_id, search, sort_by);
    let doc_task = tokio::task::spawn_blocking(move || -> AppResult<Vec<Document>> {
        let (folder_id, case_id, search, sort_by) = doc_filters;
        let mut conn = doc_state.db()?;

        let mut query = documents::table.into_boxed();
        match &search {
            Some(search) => {
                query = query.filter(documents::title.ilike(format!("%{search}%")));
            }
            None => {
                query = match folder_id {
                    Some(folder_id) => query.filter(documents::folder_id.eq(folder_id)),
                    None => query.filter(documents::folder_id.is_null()),
                };
            }
        }
        if let Some(case_id) = case_id {
            query = query.filter(documents::case_id.eq(case_id));
        }

        query = order_documents(query, sort_by.as_deref(), descending);

        Ok(query.limit(limit).offset(offset).load(&mut conn)?)
    });

    let (folder_rows, doc_rows) = tokio::try_join!(folder_task, doc_task)
        .map_err(|err| AppError::internal(format!("listing task panicked: {err}")))?;
    let (folder_rows, doc_rows) = (folder_rows?, doc_rows?);

    let mut entries = Vec::with_capacity(folder_rows.len() + doc_rows.len());
    for folder in folder_rows {
        entries.push(FileSystemEntry {
            id: folder.id,
            name: folder.name,
            entry_type: EntryType::Folder,
            size: None,
            extension: None,
            parent_id: folder.parent_id,
            created_by: folder.created_by,
            created_at: to_iso(folder.created_at),
        });
    }
    for doc in doc_rows {
        entries.push(FileSystemEntry {
            id: doc.id,
            name: doc.title,
            entry_type: EntryType::File,
            size: Some(doc.file_size),
            extension: Some(doc.file_extension),
            parent_id: doc.folder_id,
            created_by: doc.uploaded_by,
            created_at: to_iso(doc.created_at),
        });
    }

    Ok(Json(entries))
}

pub async fn download_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<DocumentDownloadResponse>> {
    let mut conn = state.db()?;
    let doc: Option<Document> = documents::table
        .find(document_id)
        .first(&mut conn)
        .optional()?;
    let doc = doc.ok_or_else(AppError::not_found)?;
    drop(conn);

    let url = state
        .storage
        .presign_get_object(
            &doc.storage_key,
            Duration::from_secs(PRESIGNED_URL_EXPIRY_SECONDS),
        )
        .await
        .map_err(|err| AppError::internal(format!("failed to generate download URL: {err}")))?;

    Ok(Json(DocumentDownloadResponse {
        download_url: url,
        expires_in: PRESIGNED_URL_EXPIRY_SECONDS,
    }))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let doc: Option<Document> = documents::table
        .find(document_id)
        .first(&mut conn)
        .optional()?;
    let doc = doc.ok_or_else(AppError::not_found)?;
    drop(conn);

    // Blob first: if this fails the row stays, so metadata never dangles
    // while the blob still exists.
    state
        .storage
        .delete_object(&doc.storage_key)
        .await
        .map_err(|err| {
            error!(error = %err, key = %doc.storage_key, "failed to delete document blob");
            AppError::internal(format!("failed to delete document blob: {err}"))
        })?;

    let mut conn = state.db()?;
    diesel::delete(documents::table.find(document_id)).execute(&mut conn)?;

    info!(document_id = %document_id, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn parse_uuid_field(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> AppResult<Option<Uuid>> {
    let value = field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid {name}: {err}")))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(trimmed)
        .map(Some)
        .map_err(|_| AppError::bad_request(format!("{name} must be a valid UUID")))
}

fn order_documents(
    query: documents::BoxedQuery<'static, Pg>,
    sort_by: Option<&str>,
    descending: bool,
) -> documents::BoxedQuery<'static, Pg> {
    match (sort_by, descending) {
        (Some("title"), false) => query.order(documents::title.asc()),
        (Some("title"), true) => query.order(documents::title.desc()),
        (Some("file_size"), false) => query.order(documents::file_size.asc()),
        (Some("file_size"), true) => query.order(documents::file_size.desc()),
        (_, false) => query.order(documents::created_at.asc()),
        (_, true) => query.order(documents::created_at.desc()),
    }
}

fn validate_page_window(limit: Option<i64>, offset: Option<i64>) -> AppResult<(i64, i64)> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let offset = offset.unwrap_or(0);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }
    if offset < 0 {
        return Err(AppError::bad_request("offset must not be negative"));
    }
    Ok((limit, offset))
}

fn normalized_search(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn file_extension(filename: &str) -> String {
    FsPath::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Keys combine the namespace, the case scope when present, and a fresh
/// UUID, so they never collide and cannot be guessed from metadata.
fn build_storage_key(case_id: Option<Uuid>, extension: &str) -> String {
    match case_id {
        Some(case_id) => format!("{STORAGE_NAMESPACE}/{case_id}/{}{extension}", Uuid::new_v4()),
        None => format!("{STORAGE_NAMESPACE}/{}{extension}", Uuid::new_v4()),
    }
}

fn to_document_response(doc: Document) -> DocumentResponse {
    DocumentResponse {
        id: doc.id,
        case_id: doc.case_id,
        folder_id: doc.folder_id,
        title: doc.title,
        original_filename: doc.original_filename,
        file_size: doc.file_size,
        mime_type: doc.mime_type,
        file_extension: doc.file_extension,
        version: doc.version,
        is_archived: doc.is_archived,
        uploaded_by: doc.uploaded_by,
        created_at: to_iso(doc.created_at),
        updated_at: to_iso(doc.updated_at),
    }
}
