use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::email::{EmailService, Mailer, send_piket_reminder};
use crate::model::piket::{DispatchStatus, JadwalPiket, PiketAssignee, ReminderLog};
use crate::utils::wib::{DAY_NAMES, now_wib, to_wib, today_weekday};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::ToSchema;

/// Result of one reminder dispatch run, mirrored into the audit log.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub status: DispatchStatus,
    pub message: String,
    pub day_name: String,
    pub date_str: String,
    pub recipients_count: i64,
    pub failed_emails: Vec<String>,
}

async fn write_reminder_log(
    pool: &SqlitePool,
    day_of_week: i64,
    day_name: &str,
    recipients_count: i64,
    recipients_json: &str,
    status: DispatchStatus,
    error_message: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO email_reminder_logs
        (day_of_week, day_name, recipients_count, recipients, status, error_message, sent_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(day_of_week)
    .bind(day_name)
    .bind(recipients_count)
    .bind(recipients_json)
    .bind(status)
    .bind(error_message)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Resolve today's duty roster (weekday in WIB) and send each assignee a
/// reminder. Writes exactly one audit log row per run.
///
/// A per-recipient delivery failure is accumulated and never aborts the
/// rest; a provider authentication failure abandons the whole batch and
/// reports every recipient as failed.
pub async fn dispatch_todays_reminders<M: Mailer>(
    pool: &SqlitePool,
    mailer: &M,
) -> Result<DispatchOutcome, sqlx::Error> {
    let now = now_wib();
    let day_of_week = today_weekday();
    let day_name = DAY_NAMES[day_of_week as usize].to_string();
    let date_str = now.format("%d %B %Y").to_string();

    let jadwal_id: Option<i64> =
        sqlx::query_scalar("SELECT id FROM jadwal_piket WHERE day_of_week = ?")
            .bind(day_of_week)
            .fetch_optional(pool)
            .await?;

    let Some(jadwal_id) = jadwal_id else {
        write_reminder_log(
            pool,
            day_of_week,
            &day_name,
            0,
            "[]",
            DispatchStatus::Skipped,
            Some("No jadwal piket configured for this day"),
        )
        .await?;
        return Ok(DispatchOutcome {
            status: DispatchStatus::Skipped,
            message: format!("No piket for {day_name}"),
            day_name,
            date_str,
            recipients_count: 0,
            failed_emails: Vec::new(),
        });
    };

    let assigned: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT u.email
        FROM piket_assignments a
        JOIN users u ON u.id = a.user_id
        WHERE a.jadwal_id = ?
        "#,
    )
    .bind(jadwal_id)
    .fetch_all(pool)
    .await?;

    if assigned.is_empty() {
        write_reminder_log(
            pool,
            day_of_week,
            &day_name,
            0,
            "[]",
            DispatchStatus::Skipped,
            Some("No members assigned"),
        )
        .await?;
        return Ok(DispatchOutcome {
            status: DispatchStatus::Skipped,
            message: format!("No members for {day_name}"),
            day_name,
            date_str,
            recipients_count: 0,
            failed_emails: Vec::new(),
        });
    }

    let recipients: Vec<String> = assigned
        .into_iter()
        .filter(|e| !e.trim().is_empty())
        .collect();

    if recipients.is_empty() {
        write_reminder_log(
            pool,
            day_of_week,
            &day_name,
            0,
            "[]",
            DispatchStatus::Failed,
            Some("No valid emails"),
        )
        .await?;
        return Ok(DispatchOutcome {
            status: DispatchStatus::Failed,
            message: "No valid emails".to_string(),
            day_name,
            date_str,
            recipients_count: 0,
            failed_emails: Vec::new(),
        });
    }

    let report = send_piket_reminder(mailer, &recipients, &day_name, &date_str, "").await;
    let snapshot = serde_json::to_string(&recipients).unwrap_or_else(|_| "[]".to_string());
    let recipients_count = recipients.len() as i64;

    let (status, error_message) = if !report.success {
        (DispatchStatus::Failed, Some(report.message.as_str()))
    } else if report.failed_emails.is_empty() {
        (DispatchStatus::Success, None)
    } else {
        (DispatchStatus::Partial, Some(report.message.as_str()))
    };

    write_reminder_log(
        pool,
        day_of_week,
        &day_name,
        recipients_count,
        &snapshot,
        status,
        error_message,
    )
    .await?;

    Ok(DispatchOutcome {
        status,
        message: report.message,
        day_name,
        date_str,
        recipients_count,
        failed_emails: report.failed_emails,
    })
}

/// Full-week roster view
#[utoipa::path(
    get,
    path = "/api/piket",
    responses(
        (status = 200, description = "Seven-day schedule", body = Object, example = json!({
            "success": true, "schedule": []
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Piket"
)]
pub async fn view_piket(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    let today = today_weekday();
    let mut schedule = Vec::with_capacity(DAY_NAMES.len());

    for (idx, name) in DAY_NAMES.iter().enumerate() {
        let jadwal = sqlx::query_as::<_, JadwalPiket>(
            "SELECT * FROM jadwal_piket WHERE day_of_week = ?",
        )
        .bind(idx as i64)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch roster");
            ErrorInternalServerError("Database error")
        })?;

        let mut assignments: Vec<Value> = Vec::new();
        if let Some(jadwal) = &jadwal {
            let assignees = sqlx::query_as::<_, PiketAssignee>(
                r#"
                SELECT u.id AS user_id, u.name, u.class_name, u.email
                FROM piket_assignments a
                JOIN users u ON u.id = a.user_id
                WHERE a.jadwal_id = ?
                ORDER BY u.name
                "#,
            )
            .bind(jadwal.id)
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch assignments");
                ErrorInternalServerError("Database error")
            })?;

            assignments = assignees
                .into_iter()
                .map(|a| {
                    json!({
                        "user_id": a.user_id,
                        "name": a.name,
                        "class_name": a.class_name,
                        "email": a.email,
                        "is_current_user": a.user_id == auth.user_id,
                    })
                })
                .collect();
        }

        schedule.push(json!({
            "day_of_week": idx,
            "day_name": name,
            "is_today": idx as i64 == today,
            "assignments": assignments,
            "updated_at": jadwal
                .as_ref()
                .and_then(|j| j.updated_at)
                .map(|t| to_wib(t).to_rfc3339()),
        }));
    }

    Ok(HttpResponse::Ok().json(json!({"success": true, "schedule": schedule})))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePiketReq {
    pub day_of_week: i64,
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

async fn replace_assignments(
    pool: &SqlitePool,
    day_of_week: i64,
    user_ids: &[i64],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO jadwal_piket (day_of_week, day_name, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(day_of_week) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(day_of_week)
    .bind(DAY_NAMES[day_of_week as usize])
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    let jadwal_id: i64 = sqlx::query_scalar("SELECT id FROM jadwal_piket WHERE day_of_week = ?")
        .bind(day_of_week)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM piket_assignments WHERE jadwal_id = ?")
        .bind(jadwal_id)
        .execute(&mut *tx)
        .await?;

    for user_id in user_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO piket_assignments (jadwal_id, user_id) VALUES (?, ?)",
        )
        .bind(jadwal_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Replace a weekday's assignment set
#[utoipa::path(
    post,
    path = "/api/piket",
    request_body = UpdatePiketReq,
    responses(
        (status = 200, description = "Roster updated"),
        (status = 400, description = "day_of_week out of range"),
        (status = 403, description = "Not an administrative role")
    ),
    security(("bearer_auth" = [])),
    tag = "Piket"
)]
pub async fn update_piket(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    body: web::Json<UpdatePiketReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if !(0..=6).contains(&body.day_of_week) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false, "message": "Invalid day_of_week (0-6)"
        })));
    }

    replace_assignments(pool.get_ref(), body.day_of_week, &body.user_ids)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to update roster");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Piket for {} updated", DAY_NAMES[body.day_of_week as usize])
    })))
}

/// Clear a weekday's assignments
#[utoipa::path(
    delete,
    path = "/api/piket/{day_of_week}",
    params(("day_of_week" = i64, Path, description = "0-6, Monday = 0")),
    responses(
        (status = 200, description = "Assignments cleared"),
        (status = 404, description = "No schedule for that day")
    ),
    security(("bearer_auth" = [])),
    tag = "Piket"
)]
pub async fn clear_piket(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let day_of_week = path.into_inner();

    let jadwal_id: Option<i64> =
        sqlx::query_scalar("SELECT id FROM jadwal_piket WHERE day_of_week = ?")
            .bind(day_of_week)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch roster");
                ErrorInternalServerError("Database error")
            })?;

    let Some(jadwal_id) = jadwal_id else {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": "No schedule found for that day"
        })));
    };

    sqlx::query("DELETE FROM piket_assignments WHERE jadwal_id = ?")
        .bind(jadwal_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to clear assignments");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Assignments cleared"})))
}

/// Last 100 dispatch audit rows, newest first
#[utoipa::path(
    get,
    path = "/api/piket/logs",
    responses(
        (status = 200, description = "Reminder logs", body = Object, example = json!({
            "success": true, "logs": []
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Piket"
)]
pub async fn piket_logs(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let logs = sqlx::query_as::<_, ReminderLog>(
        "SELECT * FROM email_reminder_logs ORDER BY sent_at DESC LIMIT 100",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch reminder logs");
        ErrorInternalServerError("Database error")
    })?;

    let logs: Vec<Value> = logs
        .into_iter()
        .map(|log| {
            let recipients: Value =
                serde_json::from_str(&log.recipients).unwrap_or_else(|_| json!([]));
            json!({
                "id": log.id,
                "day_of_week": log.day_of_week,
                "day_name": log.day_name,
                "recipients_count": log.recipients_count,
                "recipients": recipients,
                "status": log.status,
                "error_message": log.error_message,
                "sent_at": to_wib(log.sent_at).to_rfc3339(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({"success": true, "logs": logs})))
}

#[derive(Deserialize, ToSchema)]
pub struct TestReminderReq {
    pub day_of_week: Option<i64>,
}

/// Test-send a reminder to a weekday's roster
///
/// Same per-recipient loop as the scheduled dispatch, but writes no
/// audit log row.
#[utoipa::path(
    post,
    path = "/api/piket/test-reminder",
    request_body = TestReminderReq,
    responses(
        (status = 200, description = "Send report"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "No assignments for that day")
    ),
    security(("bearer_auth" = [])),
    tag = "Piket"
)]
pub async fn test_piket_reminder(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    mailer: web::Data<EmailService>,
    body: web::Json<TestReminderReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_strict()?;

    let day_of_week = body.day_of_week.unwrap_or_else(today_weekday);
    if !(0..=6).contains(&day_of_week) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false, "message": "Invalid day_of_week (0-6)"
        })));
    }
    let day_name = DAY_NAMES[day_of_week as usize];

    let recipients: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT u.email
        FROM piket_assignments a
        JOIN jadwal_piket j ON j.id = a.jadwal_id
        JOIN users u ON u.id = a.user_id
        WHERE j.day_of_week = ?
        "#,
    )
    .bind(day_of_week)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch roster for test send");
        ErrorInternalServerError("Database error")
    })?
    .into_iter()
    .filter(|e: &String| !e.trim().is_empty())
    .collect();

    if recipients.is_empty() {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false, "message": format!("No assignments for {day_name}")
        })));
    }

    let date_str = now_wib().format("%d %B %Y").to_string();
    let report = send_piket_reminder(
        mailer.get_ref(),
        &recipients,
        day_name,
        &date_str,
        "This is a TEST reminder from the admin panel.",
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "success": report.success,
        "message": report.message,
        "failed_emails": report.failed_emails,
    })))
}

/// Scheduler entry point for the daily reminder dispatch
///
/// No login; guarded by a shared secret passed as the `X-Cron-Secret`
/// header or a JSON `secret` field.
#[utoipa::path(
    post,
    path = "/api/cron/piket-reminder",
    responses(
        (status = 200, description = "Dispatch ran", body = Object, example = json!({
            "success": true, "message": "Successfully sent 3 emails",
            "day": "Monday", "recipients_count": 3, "failed_emails": []
        })),
        (status = 401, description = "Secret mismatch"),
        (status = 502, description = "Email provider rejected credentials"),
        (status = 503, description = "CRON_SECRET_TOKEN not configured")
    ),
    tag = "Piket"
)]
pub async fn cron_piket_reminder(
    req: HttpRequest,
    body: web::Bytes,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    mailer: web::Data<EmailService>,
) -> impl Responder {
    let Some(expected) = config.cron_secret_token.as_deref() else {
        return HttpResponse::ServiceUnavailable().json(json!({
            "success": false, "error": "Service not configured"
        }));
    };

    let provided = req
        .headers()
        .get("X-Cron-Secret")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| v.get("secret").and_then(|s| s.as_str()).map(str::to_string))
        });

    match provided {
        Some(p) if p == expected => {}
        _ => {
            return HttpResponse::Unauthorized().json(json!({
                "success": false, "error": "Unauthorized"
            }));
        }
    }

    match dispatch_todays_reminders(pool.get_ref(), mailer.get_ref()).await {
        Ok(outcome) => {
            info!(
                status = %outcome.status,
                recipients = outcome.recipients_count,
                failed = outcome.failed_emails.len(),
                "piket reminder dispatch complete"
            );
            match outcome.status {
                DispatchStatus::Failed if outcome.failed_emails.is_empty() => {
                    HttpResponse::InternalServerError().json(json!({
                        "success": false, "error": outcome.message
                    }))
                }
                DispatchStatus::Failed => HttpResponse::BadGateway().json(json!({
                    "success": false,
                    "message": outcome.message,
                    "recipients_count": outcome.recipients_count,
                    "failed_emails": outcome.failed_emails,
                })),
                _ => HttpResponse::Ok().json(json!({
                    "success": true,
                    "message": outcome.message,
                    "day": outcome.day_name,
                    "date": outcome.date_str,
                    "recipients_count": outcome.recipients_count,
                    "failed_emails": outcome.failed_emails,
                })),
            }
        }
        Err(e) => {
            error!(error = %e, "Cron reminder dispatch failed");
            HttpResponse::InternalServerError().json(json!({
                "success": false, "error": "database_error"
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::email::testing::ScriptedMailer;
    use crate::model::role::Role;

    async fn seed_user(pool: &SqlitePool, name: &str, email: &str) -> i64 {
        sqlx::query("INSERT INTO users (email, password, name, role) VALUES (?, ?, ?, ?)")
            .bind(email)
            .bind("hash")
            .bind(name)
            .bind(Role::Member)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn seed_roster_for_today(pool: &SqlitePool, emails: &[&str]) {
        let mut user_ids = Vec::new();
        for (i, email) in emails.iter().enumerate() {
            user_ids.push(seed_user(pool, &format!("Member {i}"), email).await);
        }
        replace_assignments(pool, today_weekday(), &user_ids)
            .await
            .unwrap();
    }

    async fn logs(pool: &SqlitePool) -> Vec<ReminderLog> {
        sqlx::query_as::<_, ReminderLog>("SELECT * FROM email_reminder_logs")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn missing_roster_skips_and_logs_once() {
        let pool = test_pool().await;
        let mailer = ScriptedMailer::delivering();

        let outcome = dispatch_todays_reminders(&pool, &mailer).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Skipped);
        assert_eq!(outcome.recipients_count, 0);
        assert!(mailer.attempts.borrow().is_empty());

        let logs = logs(&pool).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, DispatchStatus::Skipped);
        assert_eq!(logs[0].recipients_count, 0);
    }

    #[actix_web::test]
    async fn empty_assignment_set_skips() {
        let pool = test_pool().await;
        seed_roster_for_today(&pool, &[]).await;
        let mailer = ScriptedMailer::delivering();

        let outcome = dispatch_todays_reminders(&pool, &mailer).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Skipped);
        let logs = logs(&pool).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].error_message.as_deref(), Some("No members assigned"));
    }

    #[actix_web::test]
    async fn assignees_without_emails_fail_the_run() {
        let pool = test_pool().await;
        seed_roster_for_today(&pool, &["", " "]).await;
        let mailer = ScriptedMailer::delivering();

        let outcome = dispatch_todays_reminders(&pool, &mailer).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Failed);
        assert!(mailer.attempts.borrow().is_empty());

        let logs = logs(&pool).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, DispatchStatus::Failed);
        assert_eq!(logs[0].error_message.as_deref(), Some("No valid emails"));
    }

    #[actix_web::test]
    async fn clean_run_logs_success() {
        let pool = test_pool().await;
        seed_roster_for_today(&pool, &["a@x.id", "b@x.id"]).await;
        let mailer = ScriptedMailer::delivering();

        let outcome = dispatch_todays_reminders(&pool, &mailer).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Success);
        assert_eq!(outcome.recipients_count, 2);
        assert!(outcome.failed_emails.is_empty());

        let logs = logs(&pool).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, DispatchStatus::Success);
        assert_eq!(logs[0].recipients_count, 2);
        assert!(logs[0].error_message.is_none());
    }

    #[actix_web::test]
    async fn two_of_five_failures_classify_as_partial() {
        let pool = test_pool().await;
        seed_roster_for_today(&pool, &["a@x.id", "b@x.id", "c@x.id", "d@x.id", "e@x.id"]).await;
        let mailer = ScriptedMailer::failing_for(&["b@x.id", "d@x.id"]);

        let outcome = dispatch_todays_reminders(&pool, &mailer).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Partial);
        assert_eq!(outcome.recipients_count, 5);
        assert_eq!(outcome.failed_emails.len(), 2);
        assert!(outcome.failed_emails.contains(&"b@x.id".to_string()));
        assert!(outcome.failed_emails.contains(&"d@x.id".to_string()));
        // every recipient was still attempted
        assert_eq!(mailer.attempts.borrow().len(), 5);

        let logs = logs(&pool).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, DispatchStatus::Partial);
        assert_eq!(logs[0].recipients_count, 5);
    }

    #[actix_web::test]
    async fn provider_auth_failure_fails_the_whole_batch() {
        let pool = test_pool().await;
        seed_roster_for_today(&pool, &["a@x.id", "b@x.id", "c@x.id"]).await;
        let mailer = ScriptedMailer::auth_failing();

        let outcome = dispatch_todays_reminders(&pool, &mailer).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Failed);
        assert_eq!(outcome.recipients_count, 3);
        assert_eq!(outcome.failed_emails.len(), 3);
        // remaining recipients were not attempted after the auth error
        assert_eq!(mailer.attempts.borrow().len(), 1);

        let logs = logs(&pool).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, DispatchStatus::Failed);
    }

    #[actix_web::test]
    async fn roster_snapshot_lands_in_the_log() {
        let pool = test_pool().await;
        seed_roster_for_today(&pool, &["a@x.id"]).await;
        let mailer = ScriptedMailer::delivering();

        dispatch_todays_reminders(&pool, &mailer).await.unwrap();

        let logs = logs(&pool).await;
        let snapshot: Vec<String> = serde_json::from_str(&logs[0].recipients).unwrap();
        assert_eq!(snapshot, vec!["a@x.id".to_string()]);
    }

    #[actix_web::test]
    async fn replace_assignments_is_idempotent_per_weekday() {
        let pool = test_pool().await;
        let u1 = seed_user(&pool, "A", "a@x.id").await;
        let u2 = seed_user(&pool, "B", "b@x.id").await;

        replace_assignments(&pool, 2, &[u1, u2]).await.unwrap();
        replace_assignments(&pool, 2, &[u2]).await.unwrap();

        let jadwal_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jadwal_piket")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(jadwal_count, 1);

        let assigned: Vec<i64> = sqlx::query_scalar("SELECT user_id FROM piket_assignments")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(assigned, vec![u2]);
    }
}
