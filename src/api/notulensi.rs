use crate::auth::auth::AuthUser;
use crate::model::notulensi::Notulensi;
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::ToSchema;

/// Sessions with a has_notulensi flag, newest first
#[utoipa::path(
    get,
    path = "/api/notulensi",
    responses(
        (status = 200, description = "Overview", body = Object, example = json!({
            "success": true, "sessions": []
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Notulensi"
)]
pub async fn overview(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, (i64, String, String, Option<i64>)>(
        r#"
        SELECT s.id, s.name, s.date, n.id
        FROM sessions s
        LEFT JOIN notulensi n ON n.session_id = s.id
        ORDER BY s.date DESC, s.id DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch notulensi overview");
        ErrorInternalServerError("Database error")
    })?;

    let sessions: Vec<Value> = rows
        .into_iter()
        .map(|(id, name, date, notulensi_id)| {
            json!({
                "session_id": id,
                "name": name,
                "date": date,
                "has_notulensi": notulensi_id.is_some(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({"success": true, "sessions": sessions})))
}

/// Minutes for one session
#[utoipa::path(
    get,
    path = "/api/notulensi/session/{session_id}",
    params(("session_id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Minutes", body = Notulensi),
        (status = 404, description = "No notulensi for that session")
    ),
    security(("bearer_auth" = [])),
    tag = "Notulensi"
)]
pub async fn get_for_session(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let session_id = path.into_inner();

    let note = sqlx::query_as::<_, Notulensi>("SELECT * FROM notulensi WHERE session_id = ?")
        .bind(session_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch notulensi");
            ErrorInternalServerError("Database error")
        })?;

    match note {
        Some(note) => Ok(HttpResponse::Ok().json(json!({"success": true, "notulensi": note}))),
        None => Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "No notulensi for that session"
        }))),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpsertNotulensiReq {
    pub content: String,
}

async fn upsert_notulensi(
    pool: &SqlitePool,
    session_id: i64,
    content: &str,
) -> Result<Notulensi, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notulensi (session_id, content, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            content = excluded.content,
            updated_at = excluded.created_at
        "#,
    )
    .bind(session_id)
    .bind(content)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Notulensi>("SELECT * FROM notulensi WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(pool)
        .await
}

/// Create or replace the minutes for a session
///
/// One row per session; a second save replaces the first.
#[utoipa::path(
    put,
    path = "/api/notulensi/session/{session_id}",
    request_body = UpsertNotulensiReq,
    params(("session_id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Minutes saved", body = Notulensi),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notulensi"
)]
pub async fn upsert(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<UpsertNotulensiReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let session_id = path.into_inner();

    let content = body.content.trim();
    if content.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false, "message": "Content must not be empty"
        })));
    }

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM sessions WHERE id = ?")
        .bind(session_id)
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

    let note = upsert_notulensi(pool.get_ref(), session_id, content)
        .await
        .map_err(|e| {
            error!(error = %e, session_id, "Failed to save notulensi");
            ErrorInternalServerError("Database error")
        })?;

    info!(session_id, "Notulensi saved");
    Ok(HttpResponse::Ok().json(json!({"success": true, "notulensi": note})))
}

/// Delete minutes by id
#[utoipa::path(
    delete,
    path = "/api/notulensi/{id}",
    params(("id" = i64, Path, description = "Notulensi id")),
    responses(
        (status = 200, description = "Notulensi deleted"),
        (status = 404, description = "Notulensi not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notulensi"
)]
pub async fn delete(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let deleted = sqlx::query("DELETE FROM notulensi WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to delete notulensi");
            ErrorInternalServerError("Database error")
        })?
        .rows_affected();

    if deleted == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "Notulensi not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Notulensi deleted"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed_session(pool: &SqlitePool) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO sessions (name, date, is_locked, session_type, created_at)
            VALUES ('Rapat', '2026-02-05', 0, 'all', ?)
            "#,
        )
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[actix_web::test]
    async fn second_save_replaces_instead_of_duplicating() {
        let pool = test_pool().await;
        let session_id = seed_session(&pool).await;

        let first = upsert_notulensi(&pool, session_id, "draft").await.unwrap();
        assert_eq!(first.content, "draft");
        assert!(first.updated_at.is_none());

        let second = upsert_notulensi(&pool, session_id, "final").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.content, "final");
        assert!(second.updated_at.is_some());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notulensi")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
