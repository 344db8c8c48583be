use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Meeting minutes attached to a session, at most one per session.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Notulensi {
    pub id: i64,
    pub session_id: i64,
    pub content: String,
    #[serde(serialize_with = "crate::utils::wib::serialize_wib")]
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "crate::utils::wib::serialize_wib_opt")]
    #[schema(value_type = Option<String>)]
    pub updated_at: Option<DateTime<Utc>>,
}
