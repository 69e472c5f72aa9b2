//! Bearer tokens
//!
//! Access and refresh tokens are signed with separate secrets; a refresh
//! token is never accepted where an access token is expected.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub role: String,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
}

pub fn issue(
    user_id: Uuid,
    role: &str,
    kind: TokenKind,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        kind,
        exp: now + ttl_secs,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|_| TokenError::Invalid)
}

pub fn verify(token: &str, kind: TokenKind, secret: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;
    if data.claims.kind != kind {
        return Err(TokenError::Invalid);
    }
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_roundtrip() {
        let id = Uuid::new_v4();
        let token = issue(id, "user", TokenKind::Access, SECRET, 3600).unwrap();
        let claims = verify(&token, TokenKind::Access, SECRET).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue(Uuid::new_v4(), "user", TokenKind::Access, SECRET, 3600).unwrap();
        assert!(matches!(
            verify(&token, TokenKind::Access, "other-secret"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_refresh_not_accepted_as_access() {
        let token = issue(Uuid::new_v4(), "user", TokenKind::Refresh, SECRET, 3600).unwrap();
        assert!(matches!(verify(&token, TokenKind::Access, SECRET), Err(TokenError::Invalid)));
        assert!(verify(&token, TokenKind::Refresh, SECRET).is_ok());
    }

    #[test]
    fn test_expired_rejected() {
        let token = issue(Uuid::new_v4(), "user", TokenKind::Access, SECRET, -120).unwrap();
        assert!(matches!(verify(&token, TokenKind::Access, SECRET), Err(TokenError::Expired)));
    }
}
