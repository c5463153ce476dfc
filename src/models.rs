use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Archive,
    InWork,
    Debt,
    Executed,
    Withdrawn,
    Cancelled,
    Fssp,
}

impl CaseStatus {
    pub const ALL: &'static [CaseStatus] = &[
        CaseStatus::Archive,
        CaseStatus::InWork,
        CaseStatus::Debt,
        CaseStatus::Executed,
        CaseStatus::Withdrawn,
        CaseStatus::Cancelled,
        CaseStatus::Fssp,
    ];

    /// Statuses that no longer count toward the active workload.
    pub const INACTIVE: &'static [CaseStatus] = &[
        CaseStatus::Executed,
        CaseStatus::Cancelled,
        CaseStatus::Archive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Archive => "archive",
            CaseStatus::InWork => "in_work",
            CaseStatus::Debt => "debt",
            CaseStatus::Executed => "executed",
            CaseStatus::Withdrawn => "withdrawn",
            CaseStatus::Cancelled => "cancelled",
            CaseStatus::Fssp => "fssp",
        }
    }

    pub fn parse(value: &str) -> Option<CaseStatus> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Individual,
    Organization,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Individual => "individual",
            ClientType::Organization => "organization",
        }
    }

    pub fn parse(value: &str) -> Option<ClientType> {
        match value {
            "individual" => Some(ClientType::Individual),
            "organization" => Some(ClientType::Organization),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Ceo,
    Accountant,
    Expert,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Ceo => "ceo",
            UserRole::Accountant => "accountant",
            UserRole::Expert => "expert",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<UserRole> {
        match value {
            "ceo" => Some(UserRole::Ceo),
            "accountant" => Some(UserRole::Accountant),
            "expert" => Some(UserRole::Expert),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
    pub specialization: Option<String>,
    pub settings: serde_json::Value,
    pub can_authenticate: bool,
    pub is_active: bool,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
    pub specialization: Option<String>,
    pub settings: serde_json::Value,
    pub can_authenticate: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = user_email_configs)]
#[diesel(belongs_to(User))]
pub struct UserEmailConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub smtp_user: String,
    pub smtp_password_encrypted: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_email_configs)]
pub struct NewUserEmailConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub smtp_user: String,
    pub smtp_password_encrypted: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = clients)]
pub struct Client {
    pub id: Uuid,
    pub client_type: String,
    pub name: String,
    pub inn: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = clients)]
pub struct NewClient {
    pub id: Uuid,
    pub client_type: String,
    pub name: String,
    pub inn: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = contacts)]
#[diesel(belongs_to(Client))]
pub struct Contact {
    pub id: Uuid,
    pub client_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contacts)]
pub struct NewContact {
    pub id: Uuid,
    pub client_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = cases)]
pub struct Case {
    pub id: Uuid,
    pub number: String,
    pub case_number: String,
    pub authority: String,
    pub client_id: Uuid,
    pub case_type: String,
    pub object_type: String,
    pub object_address: String,
    pub status: String,
    pub start_date: NaiveDateTime,
    pub deadline: NaiveDateTime,
    pub cost: Decimal,
    pub plaintiff: Option<String>,
    pub defendant: Option<String>,
    pub bank_transfer_amount: Decimal,
    pub cash_amount: Decimal,
    pub remaining_debt: Decimal,
    pub completion_date: Option<NaiveDateTime>,
    pub assigned_expert_id: Option<Uuid>,
    pub archive_status: Option<String>,
    pub remarks: Option<String>,
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cases)]
pub struct NewCase {
    pub id: Uuid,
    pub number: String,
    pub case_number: String,
    pub authority: String,
    pub client_id: Uuid,
    pub case_type: String,
    pub object_type: String,
    pub object_address: String,
    pub status: String,
    pub start_date: NaiveDateTime,
    pub deadline: NaiveDateTime,
    pub cost: Decimal,
    pub plaintiff: Option<String>,
    pub defendant: Option<String>,
    pub bank_transfer_amount: Decimal,
    pub cash_amount: Decimal,
    pub remaining_debt: Decimal,
    pub completion_date: Option<NaiveDateTime>,
    pub assigned_expert_id: Option<Uuid>,
    pub archive_status: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = folders)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = folders)]
pub struct NewFolder {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = documents)]
#[diesel(belongs_to(Folder, foreign_key = folder_id))]
pub struct Document {
    pub id: Uuid,
    pub case_id: Option<Uuid>,
    pub folder_id: Option<Uuid>,
    pub title: String,
    pub original_filename: String,
    pub storage_key: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_extension: String,
    pub version: i32,
    pub is_archived: bool,
    pub uploaded_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub case_id: Option<Uuid>,
    pub folder_id: Option<Uuid>,
    pub title: String,
    pub original_filename: String,
    pub storage_key: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_extension: String,
    pub version: i32,
    pub uploaded_by: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = sessions)]
pub struct SessionRow {
    pub token_hash: String,
    pub user_id: Uuid,
    pub claims: serde_json::Value,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSessionRow {
    pub token_hash: String,
    pub user_id: Uuid,
    pub claims: serde_json::Value,
    pub expires_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_status_round_trips_through_str() {
        for status in CaseStatus::ALL {
            assert_eq!(CaseStatus::parse(status.as_str()), Some(*status));
        }
        assert_eq!(CaseStatus::parse("unknown"), None);
    }

    #[test]
    fn inactive_statuses_cover_terminal_states() {
        assert!(CaseStatus::INACTIVE.contains(&CaseStatus::Executed));
        assert!(CaseStatus::INACTIVE.contains(&CaseStatus::Cancelled));
        assert!(CaseStatus::INACTIVE.contains(&CaseStatus::Archive));
        assert!(!CaseStatus::INACTIVE.contains(&CaseStatus::InWork));
        assert!(!CaseStatus::INACTIVE.contains(&CaseStatus::Debt));
    }
}
