use crate::model::role::Role;
use serde::Serialize;
use utoipa::ToSchema;

/// Full row, including the password hash. Never serialized as-is.
#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub class_name: Option<String>,
    pub must_change_password: bool,
}

/// What the API returns for a user.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct UserOut {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub class_name: Option<String>,
}
