use crate::auth::auth::AuthUser;
use crate::model::session::{Session, SessionKind};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

fn parse_session_kind(raw: Option<&str>) -> SessionKind {
    raw.and_then(|s| s.parse().ok()).unwrap_or(SessionKind::All)
}

/// List sessions, newest first
#[utoipa::path(
    get,
    path = "/api/sessions",
    params(("type" = Option<String>, Query, description = "Filter by session type")),
    responses(
        (status = 200, description = "Sessions", body = Object, example = json!({
            "success": true, "sessions": []
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn list_sessions(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<ListQuery>,
) -> actix_web::Result<impl Responder> {
    let sessions = match &query.kind {
        Some(raw) => {
            let kind = parse_session_kind(Some(raw));
            sqlx::query_as::<_, Session>(
                "SELECT * FROM sessions WHERE session_type = ? ORDER BY date DESC, id DESC",
            )
            .bind(kind)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as::<_, Session>("SELECT * FROM sessions ORDER BY date DESC, id DESC")
                .fetch_all(pool.get_ref())
                .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to list sessions");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(json!({"success": true, "sessions": sessions})))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionReq {
    pub name: String,
    #[schema(example = "2026-02-05", value_type = String)]
    pub date: NaiveDate,
    pub session_type: Option<String>,
    pub description: Option<String>,
    pub pic_id: Option<i64>,
}

/// Create a session
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionReq,
    responses(
        (status = 201, description = "Session created"),
        (status = 400, description = "Missing name"),
        (status = 403, description = "Not an administrative role")
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn create_session(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    body: web::Json<CreateSessionReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = body.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false, "message": "Session name is required"
        })));
    }

    // unrecognised type strings fall back to the default bucket
    let kind = parse_session_kind(body.session_type.as_deref());

    let id = sqlx::query(
        r#"
        INSERT INTO sessions (name, date, is_locked, session_type, description, pic_id, created_at)
        VALUES (?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(body.date)
    .bind(kind)
    .bind(&body.description)
    .bind(body.pic_id)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create session");
        ErrorInternalServerError("Database error")
    })?
    .last_insert_rowid();

    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to read back session");
            ErrorInternalServerError("Database error")
        })?;

    info!(session_id = id, name = %session.name, "Session created");
    Ok(HttpResponse::Created().json(json!({"success": true, "session": session})))
}

async fn delete_session_cascade(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM attendance WHERE session_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM notulensi WHERE session_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;
    Ok(deleted)
}

/// Delete a session and its attendance and notulensi
#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted"),
        (status = 403, description = "Not an administrative role"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn delete_session(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let deleted = delete_session_cascade(pool.get_ref(), id).await.map_err(|e| {
        error!(error = %e, session_id = id, "Failed to delete session");
        ErrorInternalServerError("Database error")
    })?;

    if deleted == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "Session not found"
        })));
    }

    info!(session_id = id, "Session deleted");
    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Session deleted"})))
}

/// Lock a session against further marks
///
/// Locking is one-way; there is no unlock endpoint.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/lock",
    params(("id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session locked"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn lock_session(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let updated = sqlx::query("UPDATE sessions SET is_locked = 1 WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, session_id = id, "Failed to lock session");
            ErrorInternalServerError("Database error")
        })?
        .rows_affected();

    if updated == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "Session not found"
        })));
    }

    info!(session_id = id, "Session locked");
    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Session locked"})))
}

/// Lock state of one session
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/status",
    params(("id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Lock state", body = Object, example = json!({
            "success": true, "session_id": 1, "is_locked": false
        })),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn session_status(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let is_locked: Option<bool> =
        sqlx::query_scalar("SELECT is_locked FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, session_id = id, "Failed to fetch session status");
                ErrorInternalServerError("Database error")
            })?;

    match is_locked {
        Some(is_locked) => Ok(HttpResponse::Ok().json(json!({
            "success": true, "session_id": id, "is_locked": is_locked
        }))),
        None => Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "Session not found"
        }))),
    }
}

/// All attendance rows for one session, with member names
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/attendance",
    params(("id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Attendance records", body = Object, example = json!({
            "success": true, "session_id": 1, "records": []
        })),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn session_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch session");
            ErrorInternalServerError("Database error")
        })?;

    if exists.is_none() {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "Session not found"
        })));
    }

    let rows = sqlx::query_as::<_, (i64, i64, String, Option<String>, String, String)>(
        r#"
        SELECT a.id, a.user_id, u.name, u.class_name, a.status, a.attendance_type
        FROM attendance a
        JOIN users u ON u.id = a.user_id
        WHERE a.session_id = ?
        ORDER BY u.name
        "#,
    )
    .bind(id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch session attendance");
        ErrorInternalServerError("Database error")
    })?;

    let records: Vec<Value> = rows
        .into_iter()
        .map(|(att_id, user_id, name, class_name, status, attendance_type)| {
            json!({
                "id": att_id,
                "user_id": user_id,
                "name": name,
                "class_name": class_name,
                "status": status,
                "attendance_type": attendance_type,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true, "session_id": id, "records": records
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct AssignPicReq {
    pub pic_id: Option<i64>,
}

/// Set or clear the user responsible for a session
#[utoipa::path(
    put,
    path = "/api/sessions/{id}/pic",
    request_body = AssignPicReq,
    params(("id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "PIC updated"),
        (status = 400, description = "pic_id does not match any user"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn assign_pic(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<AssignPicReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    if let Some(pic_id) = body.pic_id {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(pic_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch user");
                ErrorInternalServerError("Database error")
            })?;
        if exists.is_none() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "success": false, "message": "pic_id does not match any user"
            })));
        }
    }

    let updated = sqlx::query("UPDATE sessions SET pic_id = ? WHERE id = ?")
        .bind(body.pic_id)
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, session_id = id, "Failed to assign PIC");
            ErrorInternalServerError("Database error")
        })?
        .rows_affected();

    if updated == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "Session not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "PIC updated"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::model::role::Role;

    #[test]
    fn unknown_type_strings_fall_back_to_all() {
        assert_eq!(parse_session_kind(Some("core")), SessionKind::Core);
        assert_eq!(parse_session_kind(Some("event")), SessionKind::Event);
        assert_eq!(parse_session_kind(Some("banana")), SessionKind::All);
        assert_eq!(parse_session_kind(None), SessionKind::All);
    }

    async fn seed_session(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO sessions (name, date, is_locked, session_type, created_at)
            VALUES (?, '2026-02-05', 0, 'all', ?)
            "#,
        )
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[actix_web::test]
    async fn delete_cascades_to_attendance_and_notes() {
        let pool = test_pool().await;
        let session_id = seed_session(&pool, "Kajian").await;

        let user_id = sqlx::query("INSERT INTO users (email, password, name, role) VALUES ('a@x.id', 'h', 'A', ?)")
            .bind(Role::Member)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query(
            r#"
            INSERT INTO attendance (session_id, user_id, status, attendance_type, timestamp)
            VALUES (?, ?, 'present', 'regular', ?)
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO notulensi (session_id, content, created_at) VALUES (?, 'notes', ?)",
        )
        .bind(session_id)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let deleted = delete_session_cascade(&pool, session_id).await.unwrap();
        assert_eq!(deleted, 1);

        let attendance: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
            .fetch_one(&pool)
            .await
            .unwrap();
        let notes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notulensi")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(attendance, 0);
        assert_eq!(notes, 0);
    }

    #[actix_web::test]
    async fn deleting_a_missing_session_reports_zero_rows() {
        let pool = test_pool().await;
        assert_eq!(delete_session_cascade(&pool, 99).await.unwrap(), 0);
    }
}
