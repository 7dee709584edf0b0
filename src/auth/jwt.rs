use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::model::role::Role;
use crate::models::{Claims, TokenType};

/// Who a token is issued to.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
}

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn issue(
    subject: &TokenSubject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.email.clone(),
        role: subject.role.id(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(subject: &TokenSubject, secret: &str, ttl: usize) -> Result<String, Error> {
    issue(subject, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    subject: &TokenSubject,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    issue(subject, TokenType::Refresh, secret, ttl)
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

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 42,
            email: "jane@company.com".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn access_token_carries_the_subject() {
        let token = generate_access_token(&subject(), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.sub, "jane@company.com");
        assert_eq!(Role::from_id(claims.role), Some(Role::Admin));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_tokens_get_unique_ids() {
        let (_, first) = generate_refresh_token(&subject(), "secret", 60).unwrap();
        let (_, second) = generate_refresh_token(&subject(), "secret", 60).unwrap();
        assert_eq!(first.token_type, TokenType::Refresh);
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&subject(), "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
