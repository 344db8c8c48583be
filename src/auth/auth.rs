use crate::config::Config;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use crate::utils::permissions::{is_administrative, is_core_member};
use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// The authenticated caller, decoded from the bearer token.
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        if data.claims.token_type != TokenType::Access {
            return ready(Err(ErrorUnauthorized("Not an access token")));
        }

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            email: data.claims.sub,
            role: data.claims.role,
        }))
    }
}

impl AuthUser {
    /// Admin, ketua or pembina.
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if is_administrative(self.role) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Access denied"))
        }
    }

    /// Admin or ketua.
    pub fn require_core(&self) -> actix_web::Result<()> {
        if is_core_member(self.role) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Access denied"))
        }
    }

    /// The admin role itself, not the wider administrative set.
    pub fn require_admin_strict(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }
}
