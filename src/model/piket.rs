use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Weekly duty roster row, one per weekday (0–6, Monday = 0).
#[derive(Debug, sqlx::FromRow)]
pub struct JadwalPiket {
    pub id: i64,
    pub day_of_week: i64,
    pub day_name: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A user assigned to a weekday's duty, joined with contact details.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct PiketAssignee {
    pub user_id: i64,
    pub name: String,
    pub class_name: Option<String>,
    pub email: String,
}

/// Outcome classification of one reminder dispatch run.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    sqlx::Type,
    strum::Display,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DispatchStatus {
    Success,
    Partial,
    Skipped,
    Failed,
}

/// Write-once audit row, created exactly once per dispatch attempt.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct ReminderLog {
    pub id: i64,
    pub day_of_week: i64,
    pub day_name: String,
    pub recipients_count: i64,
    /// JSON snapshot of the recipient list at dispatch time.
    pub recipients: String,
    pub status: DispatchStatus,
    pub error_message: Option<String>,
    #[serde(serialize_with = "crate::utils::wib::serialize_wib")]
    #[schema(value_type = String)]
    pub sent_at: DateTime<Utc>,
}
