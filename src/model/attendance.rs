use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
    Late,
}

/// `Core` marks are restricted to core members and tracked separately from
/// regular marks, so a user can hold one of each per session.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceKind {
    Regular,
    Core,
}

/// One attendance mark. At most one row exists per
/// (session_id, user_id, attendance_type); rows are never updated.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: i64,
    pub session_id: i64,
    pub user_id: i64,
    pub status: AttendanceStatus,
    pub attendance_type: AttendanceKind,
    #[serde(serialize_with = "crate::utils::wib::serialize_wib")]
    #[schema(value_type = String)]
    pub timestamp: DateTime<Utc>,
}
