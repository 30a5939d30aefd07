// ABOUTME: Authentication and session validation via HS256 JWTs
// ABOUTME: Issues and validates bearer tokens; the account system itself lives outside this service
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Authentication
//!
//! The session system is an external collaborator; this module is the seam the
//! HTTP boundary uses to answer "who is the current user" and "is the caller
//! authenticated". Tokens are HS256 JWTs carrying the user id as `sub`.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Result of a successful authentication
#[derive(Debug, Clone, Copy)]
pub struct AuthResult {
    /// Authenticated user id
    pub user_id: Uuid,
}

/// Manages JWT issuance and validation
#[derive(Clone)]
pub struct AuthManager {
    jwt_secret: Vec<u8>,
    token_expiry_hours: i64,
}

impl AuthManager {
    /// Create a new authentication manager
    #[must_use]
    pub const fn new(jwt_secret: Vec<u8>, token_expiry_hours: i64) -> Self {
        Self {
            jwt_secret,
            token_expiry_hours,
        }
    }

    /// Generate a token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails.
    pub fn generate_token(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let expiry = now + Duration::hours(self.token_expiry_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.jwt_secret),
        )?;
        Ok(token)
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, has a bad signature, or
    /// has expired.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.jwt_secret),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Validate a `Bearer` authorization header value
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a bearer token or the token fails
    /// validation.
    pub fn authenticate(&self, auth_header: &str) -> Result<AuthResult> {
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| anyhow!("Authorization header must use Bearer scheme"))?;

        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)?;

        Ok(AuthResult { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> AuthManager {
        AuthManager::new(b"test-secret-key-for-auth-tests".to_vec(), 24)
    }

    #[test]
    fn test_round_trip() {
        let auth = manager();
        let user_id = Uuid::new_v4();

        let token = auth.generate_token(user_id).unwrap();
        let result = auth.authenticate(&format!("Bearer {token}")).unwrap();

        assert_eq!(result.user_id, user_id);
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let auth = manager();
        let other = AuthManager::new(b"a-different-secret-entirely".to_vec(), 24);

        let token = auth.generate_token(Uuid::new_v4()).unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_rejects_non_bearer_header() {
        let auth = manager();
        assert!(auth.authenticate("Basic abc123").is_err());
    }
}
