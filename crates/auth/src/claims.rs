//! Claims carried by a portal session token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mall_core::UserId;

/// Only the subject and the validity window are signed. Role and active
/// flag are looked up again on every request, so a demoted or disabled
/// account loses access without waiting for its token to run out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub fn new(sub: UserId, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("session token expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("session token is issued in the future ({0})")]
    NotYetValid(DateTime<Utc>),

    #[error("session token has an empty validity window")]
    InvalidTimeWindow,
}

/// Check the validity window of already-decoded claims against `now`.
///
/// `issued_at` is inclusive, `expires_at` exclusive.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let SessionClaims {
        issued_at, expires_at, ..
    } = *claims;

    if expires_at <= issued_at {
        Err(TokenValidationError::InvalidTimeWindow)
    } else if now < issued_at {
        Err(TokenValidationError::NotYetValid(issued_at))
    } else if now >= expires_at {
        Err(TokenValidationError::Expired(expires_at))
    } else {
        Ok(())
    }
}
