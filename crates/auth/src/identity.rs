//! Seam to the identity endpoint (`POST /auth/login`, `GET /auth/me`).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PrincipalRecord;

/// Login credentials: an email or a phone number, plus a password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
}

/// The identifier a login attempt is keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier<'a> {
    Email(&'a str),
    Phone(&'a str),
}

impl Credentials {
    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            phone: None,
            password: password.into(),
        }
    }

    pub fn with_phone(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: None,
            phone: Some(phone.into()),
            password: password.into(),
        }
    }

    /// Exactly one non-blank identifier is required.
    pub fn identifier(&self) -> Option<LoginIdentifier<'_>> {
        let email = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let phone = self.phone.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (email, phone) {
            (Some(e), None) => Some(LoginIdentifier::Email(e)),
            (None, Some(p)) => Some(LoginIdentifier::Phone(p)),
            _ => None,
        }
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub principal: PrincipalRecord,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Login rejected (unknown account, wrong password, disabled account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The presented token was not accepted.
    #[error("credential rejected by identity service")]
    Unauthorized,

    /// The service could not be reached or answered with a server error.
    #[error("identity service unavailable: {0}")]
    Transport(String),

    /// The service answered with something that is not a principal.
    #[error("malformed identity response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, IdentityError>;

    async fn me(&self, token: &str) -> Result<PrincipalRecord, IdentityError>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, IdentityError> {
        (**self).login(credentials).await
    }

    async fn me(&self, token: &str) -> Result<PrincipalRecord, IdentityError> {
        (**self).me(token).await
    }
}
