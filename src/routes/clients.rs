use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Client, ClientType, Contact, NewClient, NewContact};
use crate::schema::{clients, contacts};
use crate::state::AppState;

use super::{to_iso, total_pages};

const DEFAULT_PAGE_LIMIT: i64 = 20;
const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct ContactInput {
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateClientRequest {
    pub client_type: ClientType,
    pub name: String,
    pub inn: String,
    /// Optional first contact, created in the same transaction.
    pub initial_contact: Option<ContactInput>,
}

#[derive(Deserialize, Default)]
pub struct UpdateClientRequest {
    pub client_type: Option<ClientType>,
    pub name: Option<String>,
    pub inn: Option<String>,
}

#[derive(Deserialize)]
pub struct ClientListQuery {
    pub client_type: Option<ClientType>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ClientResponse {
    pub id: Uuid,
    pub client_type: ClientType,
    pub name: String,
    pub inn: String,
    pub contacts: Vec<ContactResponse>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct ClientSummary {
    pub id: Uuid,
    pub client_type: ClientType,
    pub name: String,
    pub inn: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ClientListResponse {
    pub items: Vec<ClientSummary>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(payload): Json<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<ClientResponse>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let mut conn = state.db()?;

    let client_id = conn.transaction::<Uuid, AppError, _>(|conn| {
        let new_client = NewClient {
            id: Uuid::new_v4(),
            client_type: payload.client_type.as_str().to_string(),
            name: payload.name.trim().to_string(),
            inn: payload.inn.trim().to_string(),
        };
        diesel::insert_into(clients::table)
            .values(&new_client)
            .execute(conn)?;

        if let Some(contact) = &payload.initial_contact {
            let new_contact = NewContact {
                id: Uuid::new_v4(),
                client_id: new_client.id,
                full_name: contact.full_name.clone(),
                phone: contact.phone.clone(),
                email: contact.email.clone(),
                position: contact.position.clone(),
            };
            diesel::insert_into(contacts::table)
                .values(&new_contact)
                .execute(conn)?;
        }

        Ok(new_client.id)
    })?;

    info!(client_id = %client_id, "client created");
    let response = load_client_with_contacts(&mut conn, client_id)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<ClientResponse>> {
    let mut conn = state.db()?;
    Ok(Json(load_client_with_contacts(&mut conn, client_id)?))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> AppResult<Json<ClientResponse>> {
    let mut conn = state.db()?;

    let client: Option<Client> = clients::table
        .find(client_id)
        .first(&mut conn)
        .optional()?;
    let client = client.ok_or_else(AppError::not_found)?;

    let name = match payload.name {
        Some(name) => {
            let trimmed = name.trim().to_string();
            if trimmed.is_empty() {
                return Err(AppError::bad_request("name must not be empty"));
            }
            trimmed
        }
        None => client.name.clone(),
    };

    diesel::update(clients::table.find(client_id))
        .set((
            clients::client_type.eq(payload
                .client_type
                .map(|t| t.as_str().to_string())
                .unwrap_or(client.client_type)),
            clients::name.eq(name),
            clients::inn.eq(payload.inn.unwrap_or(client.inn)),
            clients::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    Ok(Json(load_client_with_contacts(&mut conn, client_id)?))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;

    // Contacts go with the client via the FK cascade.
    let deleted = diesel::delete(clients::table.find(client_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(client_id = %client_id, "client deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<ClientListQuery>,
) -> AppResult<Json<ClientListResponse>> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if page < 1 {
        return Err(AppError::bad_request("page must be at least 1"));
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }

    let mut conn = state.db()?;

    let total: i64 = filtered_clients(&params).count().get_result(&mut conn)?;

    let rows: Vec<Client> = filtered_clients(&params)
        .order(clients::created_at.desc())
        .offset((page - 1) * limit)
        .limit(limit)
        .load(&mut conn)?;

    let size = rows.len() as i64;
    let items = rows
        .into_iter()
        .map(to_client_summary)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(ClientListResponse {
        items,
        total,
        page,
        size,
        pages: total_pages(total, limit),
    }))
}

fn filtered_clients(params: &ClientListQuery) -> clients::BoxedQuery<'static, Pg> {
    let mut query = clients::table.into_boxed();

    if let Some(client_type) = params.client_type {
        query = query.filter(clients::client_type.eq(client_type.as_str()));
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        query = query.filter(
            clients::name
                .ilike(pattern.clone())
                .or(clients::inn.ilike(pattern)),
        );
    }

    query
}

fn load_client_with_contacts(conn: &mut PgConnection, client_id: Uuid) -> AppResult<ClientResponse> {
    let client: Option<Client> = clients::table.find(client_id).first(conn).optional()?;
    let client = client.ok_or_else(AppError::not_found)?;

    let contact_rows: Vec<Contact> = contacts::table
        .filter(contacts::client_id.eq(client_id))
        .order(contacts::created_at.asc())
        .load(conn)?;

    let client_type = ClientType::parse(&client.client_type).ok_or_else(|| {
        AppError::internal(format!("unknown stored client type '{}'", client.client_type))
    })?;

    Ok(ClientResponse {
        id: client.id,
        client_type,
        name: client.name,
        inn: client.inn,
        contacts: contact_rows
            .into_iter()
            .map(|c| ContactResponse {
                id: c.id,
                full_name: c.full_name,
                phone: c.phone,
                email: c.email,
                position: c.position,
                created_at: to_iso(c.created_at),
            })
            .collect(),
        created_at: to_iso(client.created_at),
        updated_at: to_iso(client.updated_at),
    })
}

fn to_client_summary(client: Client) -> AppResult<ClientSummary> {
    let client_type = ClientType::parse(&client.client_type).ok_or_else(|| {
        AppError::internal(format!("unknown stored client type '{}'", client.client_type))
    })?;

    Ok(ClientSummary {
        id: client.id,
        client_type,
        name: client.name,
        inn: client.inn,
        created_at: to_iso(client.created_at),
    })
}
