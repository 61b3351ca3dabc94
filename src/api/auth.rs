//! JWT authentication for player connections
//!
//! Players authenticate the WebSocket upgrade with `?token=<jwt>` because
//! browsers cannot set headers on WebSocket requests. Tokens are HS256 and
//! carry the account id in the `account_id` claim.
//!
//! Internal routes use a shared service secret instead, sent as
//! `Authorization: Bearer <secret>`.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AccountId;

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account the token was issued to
    pub account_id: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(account: AccountId, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            account_id: account.to_string(),
            iat: now,
            exp: now + ttl_seconds,
        }
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() > self.exp
    }
}

/// JWT signer and validator
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// TTL of issued tokens in seconds (default: 1 hour)
    pub token_ttl: i64,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: 3600,
        }
    }

    /// Issue a token for `account` with the default TTL
    pub fn issue_token(&self, account: AccountId) -> Result<String, AuthError> {
        self.issue_token_with_ttl(account, self.token_ttl)
    }

    pub fn issue_token_with_ttl(
        &self,
        account: AccountId,
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        encode(&Header::default(), &Claims::new(account, ttl_seconds), &self.encoding_key)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Validate a token and resolve the account it was issued to
    pub fn validate_token(&self, token: &str) -> Result<AccountId, AuthError> {
        let token_data: TokenData<Claims> =
            decode(token, &self.decoding_key, &Validation::default()).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::TokenError(e.to_string()),
                }
            })?;

        if token_data.claims.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        token_data
            .claims
            .account_id
            .parse()
            .map_err(|_| AuthError::InvalidAccountId)
    }

    /// Validate token from Authorization header
    /// Supports: "Bearer <token>" or just "<token>"
    pub fn validate_authorization(&self, auth_header: &str) -> Result<AccountId, AuthError> {
        self.validate_token(bearer_token(auth_header))
    }
}

/// Strip an optional `Bearer ` prefix
pub fn bearer_token(auth_header: &str) -> &str {
    auth_header
        .strip_prefix("Bearer ")
        .unwrap_or(auth_header)
        .trim()
}

/// Compare secrets without short-circuiting on the first differing byte
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token does not carry a valid account id")]
    InvalidAccountId,
}

/// Thread-safe wrapper for JwtAuth
pub type SharedJwtAuth = Arc<JwtAuth>;

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_auth() -> JwtAuth {
        JwtAuth::new("test-secret-key-that-is-at-least-32-characters-long")
    }

    #[test]
    fn test_issue_and_validate() {
        let auth = create_test_auth();
        let account = AccountId::new_v4();

        let token = auth.issue_token(account).unwrap();
        assert_eq!(auth.validate_token(&token).unwrap(), account);
    }

    #[test]
    fn test_expired_token() {
        let auth = create_test_auth();
        let token = auth
            .issue_token_with_ttl(AccountId::new_v4(), -3600)
            .unwrap();
        assert_eq!(auth.validate_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_wrong_secret() {
        let token = create_test_auth().issue_token(AccountId::new_v4()).unwrap();
        let other = JwtAuth::new("a-completely-different-secret-of-enough-length");
        assert!(matches!(
            other.validate_token(&token),
            Err(AuthError::TokenError(_))
        ));
    }

    #[test]
    fn test_garbage_token() {
        let auth = create_test_auth();
        assert!(matches!(
            auth.validate_token("not.a.jwt"),
            Err(AuthError::TokenError(_))
        ));
    }

    #[test]
    fn test_non_uuid_account_claim() {
        let auth = create_test_auth();
        let claims = Claims {
            account_id: "player-one".to_string(),
            iat: chrono::Utc::now().timestamp(),
            exp: chrono::Utc::now().timestamp() + 600,
        };
        let token = encode(&Header::default(), &claims, &auth.encoding_key).unwrap();
        assert_eq!(auth.validate_token(&token), Err(AuthError::InvalidAccountId));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"service-secret", b"service-secret"));
        assert!(!constant_time_eq(b"service-secret", b"service-secreT"));
        assert!(!constant_time_eq(b"service-secret", b"service"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_validate_authorization_header() {
        let auth = create_test_auth();
        let account = AccountId::new_v4();
        let token = auth.issue_token(account).unwrap();

        // With "Bearer " prefix
        assert_eq!(
            auth.validate_authorization(&format!("Bearer {}", token)).unwrap(),
            account
        );

        // Without prefix
        assert_eq!(auth.validate_authorization(&token).unwrap(), account);
    }
}
