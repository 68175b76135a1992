//! Signed bearer tokens for sessions and password resets.
//!
//! Both token kinds are HMAC-signed JWTs carrying a `token_type` tag so a
//! reset token can never be replayed as a session (or vice versa), even
//! though the two claim shapes already differ.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use sunleaf_core::{Phone, UserId, UserRole};
use uuid::Uuid;

use crate::models::User;

/// Discriminates the two token kinds this service issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Session,
    Reset,
}

/// Claims carried by a login session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub jti: String,
    pub sub: UserId,
    pub role: UserRole,
    pub name: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: TokenType,
}

/// Claims carried by a short-lived password reset token.
///
/// The phone the one-time code was verified against is embedded so the final
/// reset step can detect accounts whose phone changed mid-flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub jti: String,
    pub sub: UserId,
    pub phone: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: TokenType,
}

/// Issues and validates the API's signed tokens.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenSigner {
    /// Session lifetime: one day.
    pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;
    /// Reset token lifetime: fifteen minutes.
    pub const RESET_TTL_SECS: i64 = 15 * 60;

    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a session token for a freshly authenticated user.
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails.
    pub fn issue_session(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            jti: Uuid::new_v4().to_string(),
            sub: user.id,
            role: user.role,
            name: user.name.clone(),
            email: user.email.as_str().to_string(),
            iat: now,
            exp: now + Self::SESSION_TTL_SECS,
            token_type: TokenType::Session,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Issue a reset token after a one-time code was verified.
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails.
    pub fn issue_reset(
        &self,
        user_id: UserId,
        phone: &Phone,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = ResetClaims {
            jti: Uuid::new_v4().to_string(),
            sub: user_id,
            phone: phone.as_str().to_string(),
            iat: now,
            exp: now + Self::RESET_TTL_SECS,
            token_type: TokenType::Reset,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a session token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is invalid, the token is expired,
    /// or the token is not a session token.
    pub fn verify_session(
        &self,
        token: &str,
    ) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &self.decoding_key,
            &Validation::default(),
        )?;
        if data.claims.token_type != TokenType::Session {
            return Err(ErrorKind::InvalidToken.into());
        }
        Ok(data.claims)
    }

    /// Validate a reset token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is invalid, the token is expired,
    /// or the token is not a reset token.
    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<ResetClaims>(
            token,
            &self.decoding_key,
            &Validation::default(),
        )?;
        if data.claims.token_type != TokenType::Reset {
            return Err(ErrorKind::InvalidToken.into());
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sunleaf_core::Email;

    const SECRET: &[u8] = b"kX9$mP2vQ8rT5wY1zB4nC7dF0gH3jL6o";

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(42),
            name: "Rosa Alvarez".to_string(),
            username: "rosa".to_string(),
            email: Email::parse("rosa@example.com").unwrap(),
            phone: Phone::parse("5551234567").ok(),
            role: UserRole::Customer,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issue_and_validate_session() {
        let signer = TokenSigner::new(SECRET);
        let user = sample_user();

        let token = signer.issue_session(&user).unwrap();
        let claims = signer.verify_session(&token).unwrap();

        assert_eq!(claims.sub, UserId::new(42));
        assert_eq!(claims.role, UserRole::Customer);
        assert_eq!(claims.name, "Rosa Alvarez");
        assert_eq!(claims.email, "rosa@example.com");
        assert_eq!(claims.token_type, TokenType::Session);
        assert_eq!(claims.exp - claims.iat, TokenSigner::SESSION_TTL_SECS);
    }

    #[test]
    fn issue_and_validate_reset() {
        let signer = TokenSigner::new(SECRET);
        let phone = Phone::parse("5551234567").unwrap();

        let token = signer.issue_reset(UserId::new(7), &phone).unwrap();
        let claims = signer.verify_reset(&token).unwrap();

        assert_eq!(claims.sub, UserId::new(7));
        assert_eq!(claims.phone, "5551234567");
        assert_eq!(claims.exp - claims.iat, TokenSigner::RESET_TTL_SECS);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let signer = TokenSigner::new(SECRET);
        assert!(signer.verify_session("not-a-token").is_err());
        assert!(signer.verify_reset("not-a-token").is_err());
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let signer = TokenSigner::new(SECRET);
        let other = TokenSigner::new(b"aF8#bG2@cH5$dJ9%eK3^fL7&gM1*hN4!");

        let token = signer.issue_session(&sample_user()).unwrap();
        assert!(other.verify_session(&token).is_err());
    }

    #[test]
    fn reset_token_is_not_a_session() {
        let signer = TokenSigner::new(SECRET);
        let phone = Phone::parse("5551234567").unwrap();

        let token = signer.issue_reset(UserId::new(7), &phone).unwrap();
        assert!(signer.verify_session(&token).is_err());
    }

    #[test]
    fn session_token_is_not_a_reset() {
        let signer = TokenSigner::new(SECRET);

        let token = signer.issue_session(&sample_user()).unwrap();
        assert!(signer.verify_reset(&token).is_err());
    }

    #[test]
    fn expired_reset_token_is_rejected() {
        let signer = TokenSigner::new(SECRET);
        let now = Utc::now().timestamp();

        // Built directly because Validation::default() allows 60s of leeway;
        // an expiry comfortably in the past exercises the real rejection.
        let claims = ResetClaims {
            jti: Uuid::new_v4().to_string(),
            sub: UserId::new(7),
            phone: "5551234567".to_string(),
            iat: now - 3600,
            exp: now - 1800,
            token_type: TokenType::Reset,
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &signer.encoding_key).unwrap();

        let err = signer.verify_reset(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }
}
