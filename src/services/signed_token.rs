//! Time-limited signed tokens for account confirmation, password reset and
//! email change.
//!
//! Tokens are HS256 JWTs signed with the application secret. Nothing about a
//! token is stored server-side: the payload carries the user id (and, for an
//! email change, the requested address) plus an expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Token is invalid")]
    Invalid,
    #[error("Token was issued for a different purpose")]
    WrongPurpose,
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// What a token authorises. Serialised alongside the registered claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "purpose", rename_all = "snake_case")]
pub enum TokenPurpose {
    Confirm { user_id: i64 },
    Reset { user_id: i64 },
    ChangeEmail { user_id: i64, new_email: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    purpose: TokenPurpose,
}

#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_expiry: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, default_expiry: Duration) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.required_spec_claims = ["exp".to_string()].into_iter().collect();

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_expiry,
        }
    }

    pub fn default_expiry(&self) -> Duration {
        self.default_expiry
    }

    pub fn sign(&self, purpose: TokenPurpose) -> Result<String, TokenError> {
        self.sign_with_expiry(purpose, self.default_expiry)
    }

    pub fn sign_with_expiry(
        &self,
        purpose: TokenPurpose,
        expires_in: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            purpose,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Checks signature and expiry, returning the embedded purpose.
    pub fn verify(&self, token: &str) -> Result<TokenPurpose, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.purpose)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    pub fn confirmation_token(&self, user_id: i64) -> Result<String, TokenError> {
        self.sign(TokenPurpose::Confirm { user_id })
    }

    pub fn reset_token(&self, user_id: i64) -> Result<String, TokenError> {
        self.sign(TokenPurpose::Reset { user_id })
    }

    pub fn email_change_token(&self, user_id: i64, new_email: &str) -> Result<String, TokenError> {
        self.sign(TokenPurpose::ChangeEmail {
            user_id,
            new_email: new_email.to_string(),
        })
    }

    /// Returns the user id of a valid confirmation token.
    pub fn verify_confirmation(&self, token: &str) -> Result<i64, TokenError> {
        match self.verify(token)? {
            TokenPurpose::Confirm { user_id } => Ok(user_id),
            _ => Err(TokenError::WrongPurpose),
        }
    }

    /// Returns the user id of a valid reset token.
    pub fn verify_reset(&self, token: &str) -> Result<i64, TokenError> {
        match self.verify(token)? {
            TokenPurpose::Reset { user_id } => Ok(user_id),
            _ => Err(TokenError::WrongPurpose),
        }
    }

    /// Returns `(user_id, new_email)` of a valid email change token.
    pub fn verify_email_change(&self, token: &str) -> Result<(i64, String), TokenError> {
        match self.verify(token)? {
            TokenPurpose::ChangeEmail { user_id, new_email } => Ok((user_id, new_email)),
            _ => Err(TokenError::WrongPurpose),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("unit test secret", Duration::hours(1))
    }

    #[test]
    fn test_confirmation_token_carries_user_id() {
        let signer = signer();
        let token = signer.confirmation_token(42).unwrap();
        assert_eq!(signer.verify_confirmation(&token), Ok(42));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = signer();
        let token = signer
            .sign_with_expiry(TokenPurpose::Confirm { user_id: 1 }, Duration::seconds(-5))
            .unwrap();
        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_purposes_do_not_cross() {
        let signer = signer();
        let reset = signer.reset_token(7).unwrap();
        assert_eq!(
            signer.verify_confirmation(&reset),
            Err(TokenError::WrongPurpose)
        );

        let confirm = signer.confirmation_token(7).unwrap();
        assert_eq!(signer.verify_reset(&confirm), Err(TokenError::WrongPurpose));
        assert_eq!(
            signer.verify_email_change(&confirm),
            Err(TokenError::WrongPurpose)
        );
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let signer = signer();
        let mut token = signer.confirmation_token(3).unwrap();
        token.push('x');
        assert_eq!(signer.verify(&token), Err(TokenError::Invalid));
        assert_eq!(signer.verify("not-a-token"), Err(TokenError::Invalid));
    }
}
