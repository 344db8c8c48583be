use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as usize
}

fn issue(
    user_id: i64,
    email: String,
    role: Role,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> (String, Claims) {
    let claims = Claims {
        user_id,
        sub: email,
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("jwt encoding with hmac secret cannot fail");

    (token, claims)
}

pub fn generate_access_token(
    user_id: i64,
    email: String,
    role: Role,
    secret: &str,
    ttl: usize,
) -> String {
    issue(user_id, email, role, TokenType::Access, secret, ttl).0
}

pub fn generate_refresh_token(
    user_id: i64,
    email: String,
    role: Role,
    secret: &str,
    ttl: usize,
) -> (String, Claims) {
    issue(user_id, email, role, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trip() {
        let token = generate_access_token(42, "a@b.id".to_string(), Role::Ketua, "secret", 900);
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, Role::Ketua);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(1, "a@b.id".to_string(), Role::Member, "secret", 900);
        assert!(verify_token(&token, "other").is_err());
    }
}
