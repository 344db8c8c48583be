use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stored as lowercase text in `users.role`. `Ketua` is the organization
/// lead, `Pembina` the supervisor.
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
pub enum Role {
    Admin,
    Ketua,
    Pembina,
    Member,
}
