use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::user::{User, UserOut},
    models::{ChangePasswordReq, LoginReqDto, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: UserOut,
    must_change_password: bool,
}

#[instrument(name = "auth_login", skip(pool, config, body), fields(email = %body.email))]
pub async fn login(
    body: web::Json<LoginReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "success": false, "message": "Email and password are required"
        }));
    }

    debug!("Fetching user from database");
    let db_user = match sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, name, role, class_name, must_change_password
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().json(json!({
                "success": false, "message": "Invalid email or password"
            }));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if verify_password(&body.password, &db_user.password).is_err() {
        info!("Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({
            "success": false, "message": "Invalid email or password"
        }));
    }

    let access_token = generate_access_token(
        db_user.id,
        db_user.email.clone(),
        db_user.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.email.clone(),
        db_user.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");
    if let Err(e) = sqlx::query(
        r#"INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)"#,
    )
    .bind(db_user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    info!("Login successful");
    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        must_change_password: db_user.must_change_password,
        user: UserOut {
            id: db_user.id,
            email: db_user.email,
            name: db_user.name,
            role: db_user.role,
            class_name: db_user.class_name,
        },
    })
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    let record = match sqlx::query_as::<_, (i64, i64, bool)>(
        r#"SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?"#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (record_id, user_id) = match record {
        Some((id, user_id, revoked)) if !revoked => (id, user_id),
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // rotate: revoke the old refresh token before issuing a new one
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    if let Err(e) = sqlx::query(
        r#"INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)"#,
    )
    .bind(user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store rotated refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

pub async fn logout(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // idempotent: success even if the token was never stored
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    HttpResponse::NoContent().finish()
}

pub async fn me(auth: AuthUser, pool: web::Data<SqlitePool>) -> impl Responder {
    match sqlx::query_as::<_, UserOut>(
        r#"SELECT id, email, name, role, class_name FROM users WHERE id = ?"#,
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => HttpResponse::Ok().json(json!({"success": true, "user": user})),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "success": false, "message": "User not found"
        })),
        Err(e) => {
            error!(error = %e, user_id = auth.user_id, "Failed to fetch profile");
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    body: web::Json<ChangePasswordReq>,
) -> impl Responder {
    if body.new_password.len() < 6 {
        return HttpResponse::BadRequest().json(json!({
            "success": false, "message": "New password must be at least 6 characters"
        }));
    }

    let stored: Option<String> = match sqlx::query_scalar("SELECT password FROM users WHERE id = ?")
        .bind(auth.user_id)
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to fetch password hash");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let Some(stored) = stored else {
        return HttpResponse::NotFound().json(json!({
            "success": false, "message": "User not found"
        }));
    };

    if verify_password(&body.current_password, &stored).is_err() {
        return HttpResponse::Unauthorized().json(json!({
            "success": false, "message": "Current password is incorrect"
        }));
    }

    let hashed = match hash_password(&body.new_password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Failed to hash new password");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) =
        sqlx::query("UPDATE users SET password = ?, must_change_password = 0 WHERE id = ?")
            .bind(&hashed)
            .bind(auth.user_id)
            .execute(pool.get_ref())
            .await
    {
        error!(error = %e, "Failed to update password");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok().json(json!({"success": true, "message": "Password updated"}))
}
