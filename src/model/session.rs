use chrono::{DateTime, NaiveDate, Utc};
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
pub enum SessionKind {
    All,
    Core,
    Event,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Session {
    pub id: i64,
    pub name: String,
    #[schema(example = "2026-02-05", value_type = String)]
    pub date: NaiveDate,
    pub is_locked: bool,
    pub session_type: SessionKind,
    pub description: Option<String>,
    /// User responsible for this session; may mark attendance without an
    /// administrative role.
    pub pic_id: Option<i64>,
    #[serde(serialize_with = "crate::utils::wib::serialize_wib")]
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}
