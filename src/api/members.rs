use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::config::Config;
use crate::model::role::Role;
use crate::model::user::UserOut;
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use derive_more::Display;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Display)]
pub enum MemberError {
    #[display(fmt = "Member not found")]
    NotFound,
    #[display(fmt = "Cannot delete your own account")]
    OwnAccount,
    #[display(fmt = "Cannot delete the last admin")]
    LastAdmin,
    #[display(fmt = "Cannot remove the last admin's role")]
    LastAdminRole,
    #[display(fmt = "database error: {}", _0)]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for MemberError {
    fn from(e: sqlx::Error) -> Self {
        MemberError::Db(e)
    }
}

fn member_error_response(err: MemberError) -> actix_web::Result<HttpResponse> {
    match err {
        MemberError::NotFound => Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "Member not found"
        }))),
        MemberError::OwnAccount | MemberError::LastAdmin | MemberError::LastAdminRole => {
            Ok(HttpResponse::BadRequest().json(json!({
                "success": false, "message": err.to_string()
            })))
        }
        MemberError::Db(e) => {
            error!(error = %e, "Member operation failed");
            Err(ErrorInternalServerError("Database error"))
        }
    }
}

async fn count_admins(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(pool)
        .await
}

async fn delete_user_rows(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM attendance WHERE user_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM piket_assignments WHERE user_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;
    Ok(deleted)
}

/// Delete one member. Refuses the caller's own account and the last
/// remaining admin, so the organization can never lock itself out.
async fn remove_member(pool: &SqlitePool, caller_id: i64, id: i64) -> Result<(), MemberError> {
    if id == caller_id {
        return Err(MemberError::OwnAccount);
    }

    let target_role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(target_role) = target_role else {
        return Err(MemberError::NotFound);
    };

    if target_role == Role::Admin && count_admins(pool).await? <= 1 {
        return Err(MemberError::LastAdmin);
    }

    if delete_user_rows(pool, id).await? == 0 {
        return Err(MemberError::NotFound);
    }
    Ok(())
}

/// Delete a set of members in one request. Same guards as the single
/// delete; the last-admin check counts every admin in the batch.
async fn remove_members(
    pool: &SqlitePool,
    caller_id: i64,
    ids: &[i64],
) -> Result<(i64, Vec<String>), MemberError> {
    if ids.contains(&caller_id) {
        return Err(MemberError::OwnAccount);
    }

    let mut removing_admins = 0i64;
    for id in ids {
        let role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        if role == Some(Role::Admin) {
            removing_admins += 1;
        }
    }

    if count_admins(pool).await? - removing_admins < 1 {
        return Err(MemberError::LastAdmin);
    }

    let mut deleted = 0i64;
    let mut failed = Vec::new();
    for id in ids {
        let email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        let Some(email) = email else {
            continue;
        };
        match delete_user_rows(pool, *id).await {
            Ok(n) if n > 0 => deleted += 1,
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, user_id = id, "Failed to delete member in batch");
                failed.push(email);
            }
        }
    }

    Ok((deleted, failed))
}

async fn apply_member_update(
    pool: &SqlitePool,
    id: i64,
    name: Option<&str>,
    class_name: Option<String>,
    role: Option<Role>,
) -> Result<(), MemberError> {
    let existing = sqlx::query_as::<_, UserOut>(
        "SELECT id, email, name, role, class_name FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(existing) = existing else {
        return Err(MemberError::NotFound);
    };

    let new_role = role.unwrap_or(existing.role);
    if existing.role == Role::Admin && new_role != Role::Admin && count_admins(pool).await? <= 1 {
        return Err(MemberError::LastAdminRole);
    }

    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&existing.name);
    let class_name = class_name.or(existing.class_name);

    sqlx::query("UPDATE users SET name = ?, class_name = ?, role = ? WHERE id = ?")
        .bind(name)
        .bind(&class_name)
        .bind(new_role)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// List all members, ordered by name
#[utoipa::path(
    get,
    path = "/api/members",
    responses(
        (status = 200, description = "Members", body = Object, example = json!({
            "success": true, "members": []
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Members"
)]
pub async fn list_members(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    let members = sqlx::query_as::<_, UserOut>(
        "SELECT id, email, name, role, class_name FROM users ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list members");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(json!({"success": true, "members": members})))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateMemberReq {
    pub name: String,
    pub email: String,
    pub class_name: Option<String>,
    pub role: Option<Role>,
}

/// Create a member account
///
/// New accounts get the shared default password and must change it on
/// first login.
#[utoipa::path(
    post,
    path = "/api/members",
    request_body = CreateMemberReq,
    responses(
        (status = 201, description = "Member created"),
        (status = 403, description = "Not an administrative role"),
        (status = 409, description = "Email already registered", body = Object, example = json!({
            "success": false, "message": "A user with that email already exists"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Members"
)]
pub async fn create_member(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    body: web::Json<CreateMemberReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = body.name.trim();
    let email = body.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false, "message": "Name and email are required"
        })));
    }

    let hashed = hash_password(&config.default_member_password).map_err(|e| {
        error!(error = %e, "Failed to hash default password");
        ErrorInternalServerError("Hashing error")
    })?;

    let role = body.role.unwrap_or(Role::Member);

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password, name, role, class_name, must_change_password)
        VALUES (?, ?, ?, ?, ?, 1)
        "#,
    )
    .bind(&email)
    .bind(&hashed)
    .bind(name)
    .bind(role)
    .bind(&body.class_name)
    .execute(pool.get_ref())
    .await;

    let id = match result {
        Ok(r) => r.last_insert_rowid(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Ok(HttpResponse::Conflict().json(json!({
                "success": false, "message": "A user with that email already exists"
            })));
        }
        Err(e) => {
            error!(error = %e, "Failed to create member");
            return Err(ErrorInternalServerError("Database error"));
        }
    };

    info!(user_id = id, email = %email, "Member created");
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "member": {
            "id": id,
            "email": email,
            "name": name,
            "role": role,
            "class_name": body.class_name,
        }
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateMemberReq {
    pub name: Option<String>,
    pub class_name: Option<String>,
    pub role: Option<Role>,
}

/// Update a member's profile or role
#[utoipa::path(
    put,
    path = "/api/members/{id}",
    request_body = UpdateMemberReq,
    params(("id" = i64, Path, description = "Member id")),
    responses(
        (status = 200, description = "Member updated"),
        (status = 400, description = "Would demote the last admin"),
        (status = 404, description = "Member not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Members"
)]
pub async fn update_member(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<UpdateMemberReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    match apply_member_update(
        pool.get_ref(),
        id,
        body.name.as_deref(),
        body.class_name.clone(),
        body.role,
    )
    .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Member updated"}))),
        Err(e) => member_error_response(e),
    }
}

/// Delete a member
#[utoipa::path(
    delete,
    path = "/api/members/{id}",
    params(("id" = i64, Path, description = "Member id")),
    responses(
        (status = 200, description = "Member deleted"),
        (status = 400, description = "Own account or last admin", body = Object, example = json!({
            "success": false, "message": "Cannot delete the last admin"
        })),
        (status = 404, description = "Member not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Members"
)]
pub async fn delete_member(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    match remove_member(pool.get_ref(), auth.user_id, id).await {
        Ok(()) => {
            info!(user_id = id, "Member deleted");
            Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Member deleted"})))
        }
        Err(e) => member_error_response(e),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct BatchDeleteReq {
    #[serde(default)]
    pub ids: Vec<i64>,
}

/// Delete several members at once
#[utoipa::path(
    post,
    path = "/api/members/batch-delete",
    request_body = BatchDeleteReq,
    responses(
        (status = 200, description = "Batch result", body = Object, example = json!({
            "success": true, "deleted": 3, "failed": []
        })),
        (status = 400, description = "Empty id list, own account, or last admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Members"
)]
pub async fn batch_delete_members(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    body: web::Json<BatchDeleteReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if body.ids.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false, "message": "No member IDs provided"
        })));
    }

    match remove_members(pool.get_ref(), auth.user_id, &body.ids).await {
        Ok((deleted, failed)) => {
            info!(deleted, "Batch member delete");
            Ok(HttpResponse::Ok().json(json!({
                "success": true, "deleted": deleted, "failed": failed
            })))
        }
        Err(MemberError::LastAdmin) => Ok(HttpResponse::BadRequest().json(json!({
            "success": false, "message": "Cannot remove the last admin"
        }))),
        Err(e) => member_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed_user(pool: &SqlitePool, name: &str, email: &str, role: Role) -> i64 {
        sqlx::query("INSERT INTO users (email, password, name, role) VALUES (?, ?, ?, ?)")
            .bind(email)
            .bind("hash")
            .bind(name)
            .bind(role)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[actix_web::test]
    async fn the_last_admin_cannot_be_deleted() {
        let pool = test_pool().await;
        let admin = seed_user(&pool, "Admin", "admin@x.id", Role::Admin).await;
        let ketua = seed_user(&pool, "Ketua", "ketua@x.id", Role::Ketua).await;

        let err = remove_member(&pool, ketua, admin).await.unwrap_err();
        assert!(matches!(err, MemberError::LastAdmin));

        let admins = count_admins(&pool).await.unwrap();
        assert_eq!(admins, 1);
    }

    #[actix_web::test]
    async fn an_admin_can_be_deleted_while_another_remains() {
        let pool = test_pool().await;
        let first = seed_user(&pool, "Admin A", "a@x.id", Role::Admin).await;
        let second = seed_user(&pool, "Admin B", "b@x.id", Role::Admin).await;

        remove_member(&pool, first, second).await.unwrap();

        assert_eq!(count_admins(&pool).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn deleting_your_own_account_is_refused() {
        let pool = test_pool().await;
        let admin = seed_user(&pool, "Admin", "admin@x.id", Role::Admin).await;

        let err = remove_member(&pool, admin, admin).await.unwrap_err();
        assert!(matches!(err, MemberError::OwnAccount));
    }

    #[actix_web::test]
    async fn the_last_admin_cannot_be_demoted() {
        let pool = test_pool().await;
        let admin = seed_user(&pool, "Admin", "admin@x.id", Role::Admin).await;

        let err = apply_member_update(&pool, admin, None, None, Some(Role::Member))
            .await
            .unwrap_err();
        assert!(matches!(err, MemberError::LastAdminRole));

        let role: Role = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(admin)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[actix_web::test]
    async fn demotion_is_allowed_while_another_admin_remains() {
        let pool = test_pool().await;
        let first = seed_user(&pool, "Admin A", "a@x.id", Role::Admin).await;
        seed_user(&pool, "Admin B", "b@x.id", Role::Admin).await;

        apply_member_update(&pool, first, None, None, Some(Role::Member))
            .await
            .unwrap();

        assert_eq!(count_admins(&pool).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn batch_delete_refuses_to_remove_every_admin() {
        let pool = test_pool().await;
        let a = seed_user(&pool, "Admin A", "a@x.id", Role::Admin).await;
        let b = seed_user(&pool, "Admin B", "b@x.id", Role::Admin).await;
        let ketua = seed_user(&pool, "Ketua", "k@x.id", Role::Ketua).await;

        let err = remove_members(&pool, ketua, &[a, b]).await.unwrap_err();
        assert!(matches!(err, MemberError::LastAdmin));
        assert_eq!(count_admins(&pool).await.unwrap(), 2);
    }

    #[actix_web::test]
    async fn batch_delete_removes_listed_members() {
        let pool = test_pool().await;
        let admin = seed_user(&pool, "Admin", "admin@x.id", Role::Admin).await;
        let m1 = seed_user(&pool, "M1", "m1@x.id", Role::Member).await;
        let m2 = seed_user(&pool, "M2", "m2@x.id", Role::Member).await;

        let (deleted, failed) = remove_members(&pool, admin, &[m1, m2, 999]).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(failed.is_empty());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[actix_web::test]
    async fn batch_delete_including_the_caller_is_refused() {
        let pool = test_pool().await;
        let admin = seed_user(&pool, "Admin", "admin@x.id", Role::Admin).await;
        let other = seed_user(&pool, "M", "m@x.id", Role::Member).await;

        let err = remove_members(&pool, admin, &[admin, other]).await.unwrap_err();
        assert!(matches!(err, MemberError::OwnAccount));
    }
}
