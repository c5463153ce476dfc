use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Case, CaseStatus, NewCase};
use crate::schema::cases;
use crate::state::AppState;

use super::{to_iso, total_pages};

const DEFAULT_PAGE_LIMIT: i64 = 20;
const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct CreateCaseRequest {
    pub number: String,
    pub case_number: String,
    pub authority: String,
    pub client_id: Uuid,
    pub case_type: String,
    pub object_type: String,
    pub object_address: String,
    pub status: Option<CaseStatus>,
    pub start_date: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub cost: Decimal,
    pub plaintiff: Option<String>,
    pub defendant: Option<String>,
    #[serde(default)]
    pub bank_transfer_amount: Option<Decimal>,
    #[serde(default)]
    pub cash_amount: Option<Decimal>,
    #[serde(default)]
    pub remaining_debt: Option<Decimal>,
    pub completion_date: Option<DateTime<Utc>>,
    pub assigned_expert_id: Option<Uuid>,
    pub archive_status: Option<String>,
    pub remarks: Option<String>,
}

/// Partial update. An omitted field is left untouched; for nullable
/// columns an explicit `null` clears the value (`Option<Option<T>>`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Default)]
pub struct UpdateCaseRequest {
    pub number: Option<String>,
    pub case_number: Option<String>,
    pub authority: Option<String>,
    pub client_id: Option<Uuid>,
    pub case_type: Option<String>,
    pub object_type: Option<String>,
    pub object_address: Option<String>,
    pub status: Option<CaseStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub cost: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub plaintiff: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub defendant: Option<Option<String>>,
    pub bank_transfer_amount: Option<Decimal>,
    pub cash_amount: Option<Decimal>,
    pub remaining_debt: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub completion_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_expert_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub archive_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub remarks: Option<Option<String>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = cases)]
struct CaseChangeset {
    number: Option<String>,
    case_number: Option<String>,
    authority: Option<String>,
    client_id: Option<Uuid>,
    case_type: Option<String>,
    object_type: Option<String>,
    object_address: Option<String>,
    status: Option<String>,
    start_date: Option<NaiveDateTime>,
    deadline: Option<NaiveDateTime>,
    cost: Option<Decimal>,
    plaintiff: Option<Option<String>>,
    defendant: Option<Option<String>>,
    bank_transfer_amount: Option<Decimal>,
    cash_amount: Option<Decimal>,
    remaining_debt: Option<Decimal>,
    completion_date: Option<Option<NaiveDateTime>>,
    assigned_expert_id: Option<Option<Uuid>>,
    archive_status: Option<Option<String>>,
    remarks: Option<Option<String>>,
    updated_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct CaseListQuery {
    /// Comma-separated status set, e.g. `in_work,debt`.
    pub status: Option<String>,
    pub expert_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub start_date_from: Option<DateTime<Utc>>,
    pub start_date_to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct CaseResponse {
    pub id: Uuid,
    pub number: String,
    pub case_number: String,
    pub authority: String,
    pub client_id: Uuid,
    pub case_type: String,
    pub object_type: String,
    pub object_address: String,
    pub status: CaseStatus,
    pub start_date: String,
    pub deadline: String,
    pub cost: Decimal,
    pub plaintiff: Option<String>,
    pub defendant: Option<String>,
    pub bank_transfer_amount: Decimal,
    pub cash_amount: Decimal,
    pub remaining_debt: Decimal,
    pub completion_date: Option<String>,
    pub assigned_expert_id: Option<Uuid>,
    pub archive_status: Option<String>,
    pub remarks: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct PaginationInfo {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Serialize)]
pub struct CasesSummary {
    pub active: i64,
    pub overdue: i64,
    pub completed: i64,
}

#[derive(Serialize)]
pub struct CaseListResponse {
    pub data: Vec<CaseResponse>,
    pub pagination: PaginationInfo,
    pub summary: CasesSummary,
}

pub async fn create_case(
    State(state): State<AppState>,
    Json(payload): Json<CreateCaseRequest>,
) -> AppResult<(StatusCode, Json<CaseResponse>)> {
    if payload.deadline < payload.start_date {
        return Err(AppError::bad_request("deadline cannot be before start date"));
    }

    let zero = Decimal::ZERO;
    let cost = payload.cost;
    let bank_transfer_amount = payload.bank_transfer_amount.unwrap_or(zero);
    let cash_amount = payload.cash_amount.unwrap_or(zero);
    let remaining_debt = payload.remaining_debt.unwrap_or(zero);
    for (name, amount) in [
        ("cost", cost),
        ("bank_transfer_amount", bank_transfer_amount),
        ("cash_amount", cash_amount),
        ("remaining_debt", remaining_debt),
    ] {
        if amount < zero {
            return Err(AppError::bad_request(format!("{name} must not be negative")));
        }
    }

    let new_case = NewCase {
        id: Uuid::new_v4(),
        number: payload.number,
        case_number: payload.case_number,
        authority: payload.authority,
        client_id: payload.client_id,
        case_type: payload.case_type,
        object_type: payload.object_type,
        object_address: payload.object_address,
        status: payload.status.unwrap_or(CaseStatus::InWork).as_str().to_string(),
        start_date: payload.start_date.naive_utc(),
        deadline: payload.deadline.naive_utc(),
        cost,
        plaintiff: payload.plaintiff,
        defendant: payload.defendant,
        bank_transfer_amount,
        cash_amount,
        remaining_debt,
        completion_date: payload.completion_date.map(|d| d.naive_utc()),
        assigned_expert_id: payload.assigned_expert_id,
        archive_status: payload.archive_status,
        remarks: payload.remarks,
    };

    let mut conn = state.db()?;
    diesel::insert_into(cases::table)
        .values(&new_case)
        .execute(&mut conn)?;

    let case: Case = cases::table.find(new_case.id).first(&mut conn)?;
    info!(case_id = %case.id, number = %case.number, "case created");
    Ok((StatusCode::CREATED, Json(to_case_response(case)?)))
}

pub async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<Json<CaseResponse>> {
    let mut conn = state.db()?;
    let case = load_active_case(&mut conn, case_id)?;
    Ok(Json(to_case_response(case)?))
}

pub async fn update_case(
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
    Json(payload): Json<UpdateCaseRequest>,
) -> AppResult<Json<CaseResponse>> {
    let mut conn = state.db()?;
    let case = load_active_case(&mut conn, case_id)?;

    // The date invariant is checked against the merged record, so a patch
    // touching only one of the two dates can still be rejected.
    let merged_start = payload
        .start_date
        .map(|d| d.naive_utc())
        .unwrap_or(case.start_date);
    let merged_deadline = payload
        .deadline
        .map(|d| d.naive_utc())
        .unwrap_or(case.deadline);
    if merged_deadline < merged_start {
        return Err(AppError::bad_request("deadline cannot be before start date"));
    }

    let zero = Decimal::ZERO;
    for (name, amount) in [
        ("cost", payload.cost),
        ("bank_transfer_amount", payload.bank_transfer_amount),
        ("cash_amount", payload.cash_amount),
        ("remaining_debt", payload.remaining_debt),
    ] {
        if let Some(amount) = amount {
            if amount < zero {
                return Err(AppError::bad_request(format!("{name} must not be negative")));
            }
        }
    }

    let changes = CaseChangeset {
        number: payload.number,
        case_number: payload.case_number,
        authority: payload.authority,
        client_id: payload.client_id,
        case_type: payload.case_type,
        object_type: payload.object_type,
        object_address: payload.object_address,
        status: payload.status.map(|s| s.as_str().to_string()),
        start_date: payload.start_date.map(|d| d.naive_utc()),
        deadline: payload.deadline.map(|d| d.naive_utc()),
        cost: payload.cost,
        plaintiff: payload.plaintiff,
        defendant: payload.defendant,
        bank_transfer_amount: payload.bank_transfer_amount,
        cash_amount: payload.cash_amount,
        remaining_debt: payload.remaining_debt,
        completion_date: payload
            .completion_date
            .map(|opt| opt.map(|d| d.naive_utc())),
        assigned_expert_id: payload.assigned_expert_id,
        archive_status: payload.archive_status,
        remarks: payload.remarks,
        updated_at: Utc::now().naive_utc(),
    };

    diesel::update(cases::table.find(case_id))
        .set(&changes)
        .execute(&mut conn)?;

    let case: Case = cases::table.find(case_id).first(&mut conn)?;
    Ok(Json(to_case_response(case)?))
}

pub async fn delete_case(
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let case = load_active_case(&mut conn, case_id)?;

    let now = Utc::now().naive_utc();
    diesel::update(cases::table.find(case.id))
        .set((cases::deleted_at.eq(Some(now)), cases::updated_at.eq(now)))
        .execute(&mut conn)?;

    info!(case_id = %case.id, "case soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_cases(
    State(state): State<AppState>,
    Query(params): Query<CaseListQuery>,
) -> AppResult<Json<CaseListResponse>> {
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

    let statuses = parse_status_set(params.status.as_deref())?;
    let filters = CaseFilters {
        statuses,
        expert_id: params.expert_id,
        client_id: params.client_id,
        start_date_from: params.start_date_from.map(|d| d.naive_utc()),
        start_date_to: params.start_date_to.map(|d| d.naive_utc()),
    };

    let mut conn = state.db()?;

    let total: i64 = filtered_cases(&filters).count().get_result(&mut conn)?;

    let rows: Vec<Case> = filtered_cases(&filters)
        .order(cases::created_at.desc())
        .offset((page - 1) * limit)
        .limit(limit)
        .load(&mut conn)?;

    // Summary counts run over all non-deleted cases, not the filtered set.
    let inactive: Vec<&str> = CaseStatus::INACTIVE.iter().map(|s| s.as_str()).collect();
    let total_non_deleted: i64 = cases::table
        .filter(cases::deleted_at.is_null())
        .count()
        .get_result(&mut conn)?;
    let active: i64 = cases::table
        .filter(cases::deleted_at.is_null())
        .filter(cases::status.ne_all(&inactive))
        .count()
        .get_result(&mut conn)?;
    let overdue: i64 = cases::table
        .filter(cases::deleted_at.is_null())
        .filter(cases::status.ne_all(&inactive))
        .filter(cases::deadline.lt(Utc::now().naive_utc()))
        .count()
        .get_result(&mut conn)?;

    let data = rows
        .into_iter()
        .map(to_case_response)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(CaseListResponse {
        data,
        pagination: PaginationInfo {
            total,
            page,
            limit,
            total_pages: total_pages(total, limit),
        },
        summary: CasesSummary {
            active,
            overdue,
            completed: total_non_deleted - active,
        },
    }))
}

struct CaseFilters {
    statuses: Option<Vec<CaseStatus>>,
    expert_id: Option<Uuid>,
    client_id: Option<Uuid>,
    start_date_from: Option<NaiveDateTime>,
    start_date_to: Option<NaiveDateTime>,
}

fn filtered_cases(filters: &CaseFilters) -> cases::BoxedQuery<'static, Pg> {
    let mut query = cases::table
        .filter(cases::deleted_at.is_null())
        .into_boxed();

    if let Some(statuses) = &filters.statuses {
        let values: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        query = query.filter(cases::status.eq_any(values));
    }
    if let Some(expert_id) = filters.expert_id {
        query = query.filter(cases::assigned_expert_id.eq(expert_id));
    }
    if let Some(client_id) = filters.client_id {
        query = query.filter(cases::client_id.eq(client_id));
    }
    if let Some(from) = filters.start_date_from {
        query = query.filter(cases::start_date.ge(from));
    }
    if let Some(to) = filters.start_date_to {
        query = query.filter(cases::start_date.le(to));
    }

    query
}

fn parse_status_set(raw: Option<&str>) -> AppResult<Option<Vec<CaseStatus>>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let mut statuses = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let status = CaseStatus::parse(part)
            .ok_or_else(|| AppError::bad_request(format!("unknown case status '{part}'")))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }

    Ok((!statuses.is_empty()).then_some(statuses))
}

fn load_active_case(conn: &mut PgConnection, case_id: Uuid) -> AppResult<Case> {
    let case: Option<Case> = cases::table
        .find(case_id)
        .filter(cases::deleted_at.is_null())
        .first(conn)
        .optional()?;
    case.ok_or_else(AppError::not_found)
}

fn to_case_response(case: Case) -> AppResult<CaseResponse> {
    let status = CaseStatus::parse(&case.status)
        .ok_or_else(|| AppError::internal(format!("unknown stored case status '{}'", case.status)))?;

    Ok(CaseResponse {
        id: case.id,
        number: case.number,
        case_number: case.case_number,
        authority: case.authority,
        client_id: case.client_id,
        case_type: case.case_type,
        object_type: case.object_type,
        object_address: case.object_address,
        status,
        start_date: to_iso(case.start_date),
        deadline: to_iso(case.deadline),
        cost: case.cost,
        plaintiff: case.plaintiff,
        defendant: case.defendant,
        bank_transfer_amount: case.bank_transfer_amount,
        cash_amount: case.cash_amount,
        remaining_debt: case.remaining_debt,
        completion_date: case.completion_date.map(to_iso),
        assigned_expert_id: case.assigned_expert_id,
        archive_status: case.archive_status,
        remarks: case.remarks,
        created_at: to_iso(case.created_at),
        updated_at: to_iso(case.updated_at),
    })
}
