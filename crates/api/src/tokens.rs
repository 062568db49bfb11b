//! HS256 session tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use mall_auth::{SessionClaims, TokenValidationError, validate_claims};
use mall_core::UserId;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed or forged token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Issues and validates signed session tokens.
pub struct Hs256Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Tokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, sub: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.encode(&SessionClaims::new(sub, now, self.ttl))
    }

    pub fn encode(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        // Time window is checked by `validate_claims`, not by the registered `exp` claim.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_until_expiry() {
        let tokens = Hs256Tokens::new(b"test-secret", Duration::minutes(10));
        let now = Utc::now();
        let user = UserId::new();

        let token = tokens.issue(user, now).unwrap();
        assert_eq!(tokens.validate(&token, now).unwrap().sub, user);

        let later = now + Duration::minutes(11);
        assert!(matches!(
            tokens.validate(&token, later),
            Err(TokenError::Claims(TokenValidationError::Expired(_)))
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let ours = Hs256Tokens::new(b"ours", Duration::minutes(10));
        let theirs = Hs256Tokens::new(b"theirs", Duration::minutes(10));
        let now = Utc::now();

        let token = theirs.issue(UserId::new(), now).unwrap();
        assert!(matches!(ours.validate(&token, now), Err(TokenError::Decode(_))));
    }
}
