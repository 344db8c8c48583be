use crate::auth::auth::AuthUser;
use crate::model::attendance::{Attendance, AttendanceKind, AttendanceStatus};
use crate::model::role::Role;
use crate::model::session::Session;
use crate::model::user::UserOut;
use crate::utils::permissions::{can_mark_attendance_for, is_administrative, is_core_member};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Display)]
pub enum RecordError {
    #[display(fmt = "Session not found")]
    NotFound,
    #[display(fmt = "Session is locked")]
    Locked,
    #[display(fmt = "Attendance already recorded")]
    AlreadyMarked,
    #[display(fmt = "database error: {}", _0)]
    Db(sqlx::Error),
}

/// Insert one attendance mark for (session, user, kind).
///
/// The pre-check on an existing row gives the friendly error path; the
/// UNIQUE(session_id, user_id, attendance_type) constraint is the
/// authoritative guard, so a concurrent duplicate resolves to exactly one
/// inserted row and one `AlreadyMarked`.
pub async fn record_attendance(
    pool: &SqlitePool,
    session_id: i64,
    user_id: i64,
    status: AttendanceStatus,
    kind: AttendanceKind,
) -> Result<Attendance, RecordError> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await
        .map_err(RecordError::Db)?;

    let Some(session) = session else {
        return Err(RecordError::NotFound);
    };
    if session.is_locked {
        return Err(RecordError::Locked);
    }

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM attendance WHERE session_id = ? AND user_id = ? AND attendance_type = ?",
    )
    .bind(session_id)
    .bind(user_id)
    .bind(kind)
    .fetch_optional(pool)
    .await
    .map_err(RecordError::Db)?;

    if existing.is_some() {
        return Err(RecordError::AlreadyMarked);
    }

    let timestamp = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (session_id, user_id, status, attendance_type, timestamp)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .bind(status)
    .bind(kind)
    .bind(timestamp)
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(Attendance {
            id: done.last_insert_rowid(),
            session_id,
            user_id,
            status,
            attendance_type: kind,
            timestamp,
        }),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            // lost the race against a concurrent mark for the same tuple
            Err(RecordError::AlreadyMarked)
        }
        Err(e) => Err(RecordError::Db(e)),
    }
}

fn record_error_response(err: RecordError) -> HttpResponse {
    match err {
        RecordError::NotFound => HttpResponse::NotFound().json(json!({
            "success": false, "error": "not_found", "message": "Session not found"
        })),
        RecordError::Locked => HttpResponse::Forbidden().json(json!({
            "success": false, "error": "session_locked", "message": "Session is locked"
        })),
        RecordError::AlreadyMarked => HttpResponse::Conflict().json(json!({
            "success": false, "error": "already_marked", "message": "Attendance already recorded"
        })),
        RecordError::Db(e) => {
            error!(error = %e, "Attendance insert failed");
            HttpResponse::InternalServerError().json(json!({
                "success": false, "error": "database_error", "message": "Internal Server Error"
            }))
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendanceReq {
    pub session_id: i64,
    pub user_id: i64,
    pub status: AttendanceStatus,
}

/// Mark regular attendance
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendanceReq,
    responses(
        (status = 201, description = "Attendance recorded", body = Object, example = json!({
            "success": true, "attendance": {"id": 1, "status": "present"}
        })),
        (status = 403, description = "No permission or session locked"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Attendance already recorded")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    body: web::Json<MarkAttendanceReq>,
) -> impl Responder {
    // permission is evaluated against the session's responsible user; an
    // unknown session falls through to the NotFound path below
    let pic_id: Option<Option<i64>> =
        match sqlx::query_scalar("SELECT pic_id FROM sessions WHERE id = ?")
            .bind(body.session_id)
            .fetch_optional(pool.get_ref())
            .await
        {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "Failed to fetch session for permission check");
                return HttpResponse::InternalServerError().finish();
            }
        };

    if let Some(pic_id) = pic_id {
        if !can_mark_attendance_for(auth.user_id, auth.role, pic_id) {
            return HttpResponse::Forbidden().json(json!({
                "success": false, "error": "forbidden", "message": "No permission to mark attendance"
            }));
        }
    }

    match record_attendance(
        pool.get_ref(),
        body.session_id,
        body.user_id,
        body.status,
        AttendanceKind::Regular,
    )
    .await
    {
        Ok(attendance) => HttpResponse::Created().json(json!({
            "success": true, "attendance": attendance
        })),
        Err(e) => record_error_response(e),
    }
}

/// Mark core-member attendance
#[utoipa::path(
    post,
    path = "/api/attendance/core",
    request_body = MarkAttendanceReq,
    responses(
        (status = 201, description = "Core attendance recorded"),
        (status = 400, description = "Target user is not a core member"),
        (status = 403, description = "Caller is not a core member"),
        (status = 409, description = "Attendance already recorded")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_core_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    body: web::Json<MarkAttendanceReq>,
) -> impl Responder {
    if !is_core_member(auth.role) {
        return HttpResponse::Forbidden().json(json!({
            "success": false, "error": "forbidden", "message": "Access denied"
        }));
    }

    let target_role: Option<Role> = match sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(body.user_id)
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to fetch target user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match target_role {
        Some(role) if is_core_member(role) => {}
        _ => {
            return HttpResponse::BadRequest().json(json!({
                "success": false, "error": "not_core_user", "message": "User is not a core member"
            }));
        }
    }

    match record_attendance(
        pool.get_ref(),
        body.session_id,
        body.user_id,
        body.status,
        AttendanceKind::Core,
    )
    .await
    {
        Ok(attendance) => HttpResponse::Created().json(json!({
            "success": true, "attendance": attendance
        })),
        Err(e) => record_error_response(e),
    }
}

#[derive(Default, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub present: usize,
    pub absent: usize,
    pub excused: usize,
    pub late: usize,
    pub total: usize,
}

fn summarize(records: &[Attendance]) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        total: records.len(),
        ..Default::default()
    };
    for r in records {
        match r.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Excused => summary.excused += 1,
            AttendanceStatus::Late => summary.late += 1,
        }
    }
    summary
}

async fn history_payload(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<(Vec<Attendance>, AttendanceSummary), sqlx::Error> {
    let records = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE user_id = ? ORDER BY timestamp DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    let summary = summarize(&records);
    Ok((records, summary))
}

/// Caller's own attendance history with a per-status summary
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    responses(
        (status = 200, description = "History with summary", body = Object, example = json!({
            "success": true, "records": [], "summary": {"present": 0, "total": 0}
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_history(auth: AuthUser, pool: web::Data<SqlitePool>) -> impl Responder {
    match history_payload(pool.get_ref(), auth.user_id).await {
        Ok((records, summary)) => HttpResponse::Ok().json(json!({
            "success": true, "records": records, "summary": summary
        })),
        Err(e) => {
            error!(error = %e, "Failed to fetch attendance history");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// One user's attendance history (admin, or the user themselves)
#[utoipa::path(
    get,
    path = "/api/attendance/history/{user_id}",
    params(("user_id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "History with summary"),
        (status = 403, description = "Not admin and not the user"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history_for_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> impl Responder {
    let user_id = path.into_inner();
    if !is_administrative(auth.role) && auth.user_id != user_id {
        return HttpResponse::Forbidden().json(json!({
            "success": false, "message": "Access denied"
        }));
    }

    let user = match sqlx::query_as::<_, UserOut>(
        "SELECT id, email, name, role, class_name FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({
                "success": false, "message": "User not found"
            }));
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match history_payload(pool.get_ref(), user_id).await {
        Ok((records, summary)) => HttpResponse::Ok().json(json!({
            "success": true, "user": user, "records": records, "summary": summary
        })),
        Err(e) => {
            error!(error = %e, "Failed to fetch attendance history");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Admin overview: all plain members, for the history screen
#[utoipa::path(
    get,
    path = "/api/attendance/history/all",
    responses(
        (status = 200, description = "Member list", body = Object, example = json!({
            "success": true, "members": []
        })),
        (status = 403, description = "Not an administrative role")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history_all(auth: AuthUser, pool: web::Data<SqlitePool>) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let members = sqlx::query_as::<_, UserOut>(
        "SELECT id, email, name, role, class_name FROM users WHERE role = 'member' ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list members");
        actix_web::error::ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(json!({"success": true, "members": members})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::utils::wib::to_wib;

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

    async fn seed_session(pool: &SqlitePool, name: &str, locked: bool) -> i64 {
        sqlx::query(
            "INSERT INTO sessions (name, date, is_locked, session_type, created_at) VALUES (?, '2026-02-05', ?, 'all', ?)",
        )
        .bind(name)
        .bind(locked)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[actix_web::test]
    async fn records_a_mark_and_returns_it() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "Aisyah", "aisyah@x.id", Role::Member).await;
        let session = seed_session(&pool, "Kajian Jumat", false).await;

        let att = record_attendance(
            &pool,
            session,
            user,
            AttendanceStatus::Present,
            AttendanceKind::Regular,
        )
        .await
        .unwrap();

        assert_eq!(att.session_id, session);
        assert_eq!(att.status, AttendanceStatus::Present);
        assert_eq!(att.attendance_type, AttendanceKind::Regular);
    }

    #[actix_web::test]
    async fn unknown_session_is_not_found() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "Aisyah", "aisyah@x.id", Role::Member).await;

        let err = record_attendance(
            &pool,
            999,
            user,
            AttendanceStatus::Present,
            AttendanceKind::Regular,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RecordError::NotFound));
    }

    #[actix_web::test]
    async fn locked_session_rejects_marks_and_creates_no_row() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "Aisyah", "aisyah@x.id", Role::Member).await;
        let session = seed_session(&pool, "Locked one", true).await;

        let err = record_attendance(
            &pool,
            session,
            user,
            AttendanceStatus::Present,
            AttendanceKind::Regular,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RecordError::Locked));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[actix_web::test]
    async fn duplicate_mark_conflicts_and_keeps_one_row() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "Aisyah", "aisyah@x.id", Role::Member).await;
        let session = seed_session(&pool, "Kajian", false).await;

        record_attendance(
            &pool,
            session,
            user,
            AttendanceStatus::Present,
            AttendanceKind::Regular,
        )
        .await
        .unwrap();

        let err = record_attendance(
            &pool,
            session,
            user,
            AttendanceStatus::Late,
            AttendanceKind::Regular,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RecordError::AlreadyMarked));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[actix_web::test]
    async fn unique_constraint_catches_a_racing_insert() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "Aisyah", "aisyah@x.id", Role::Member).await;
        let session = seed_session(&pool, "Kajian", false).await;

        // simulate a mark that slipped past the optimistic pre-check
        sqlx::query(
            "INSERT INTO attendance (session_id, user_id, status, attendance_type, timestamp) VALUES (?, ?, 'present', 'regular', ?)",
        )
        .bind(session)
        .bind(user)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let result = sqlx::query(
            "INSERT INTO attendance (session_id, user_id, status, attendance_type, timestamp) VALUES (?, ?, 'late', 'regular', ?)",
        )
        .bind(session)
        .bind(user)
        .bind(Utc::now())
        .execute(&pool)
        .await;

        match result {
            Err(sqlx::Error::Database(db_err)) => assert!(db_err.is_unique_violation()),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn regular_and_core_marks_coexist_for_one_session() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "Ketua", "ketua@x.id", Role::Ketua).await;
        let session = seed_session(&pool, "Rapat inti", false).await;

        record_attendance(
            &pool,
            session,
            user,
            AttendanceStatus::Present,
            AttendanceKind::Regular,
        )
        .await
        .unwrap();
        record_attendance(
            &pool,
            session,
            user,
            AttendanceStatus::Present,
            AttendanceKind::Core,
        )
        .await
        .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[actix_web::test]
    async fn history_round_trip_preserves_the_mark_in_wib() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "Aisyah", "aisyah@x.id", Role::Member).await;
        let session = seed_session(&pool, "Kajian", false).await;

        let created = record_attendance(
            &pool,
            session,
            user,
            AttendanceStatus::Excused,
            AttendanceKind::Regular,
        )
        .await
        .unwrap();

        let (records, summary) = history_payload(&pool, user).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Excused);
        assert_eq!(records[0].attendance_type, AttendanceKind::Regular);
        assert_eq!(records[0].timestamp, created.timestamp);
        assert_eq!(summary.excused, 1);
        assert_eq!(summary.total, 1);

        // serialized form carries the +07:00 offset
        let body = serde_json::to_value(&records[0]).unwrap();
        let rendered = body["timestamp"].as_str().unwrap();
        assert!(rendered.ends_with("+07:00"));
        assert_eq!(rendered, to_wib(created.timestamp).to_rfc3339());
    }

    #[test]
    fn summary_counts_every_status() {
        let now = Utc::now();
        let mk = |status| Attendance {
            id: 0,
            session_id: 1,
            user_id: 1,
            status,
            attendance_type: AttendanceKind::Regular,
            timestamp: now,
        };
        let records = vec![
            mk(AttendanceStatus::Present),
            mk(AttendanceStatus::Present),
            mk(AttendanceStatus::Absent),
            mk(AttendanceStatus::Late),
        ];

        let summary = summarize(&records);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.excused, 0);
        assert_eq!(summary.total, 4);
    }
}
