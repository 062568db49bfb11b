use thiserror::Error;

use crate::IdentityError;

/// Authentication/authorization failures surfaced to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad credentials at login. Shown to the user, never retried automatically.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The persisted credential stopped being accepted after bootstrap.
    #[error("session expired")]
    SessionExpired,

    #[error("not authenticated")]
    NotAuthenticated,

    /// A resolved principal lacks the required role.
    #[error("access denied: role '{role}' is not one of {required}")]
    AuthorizationDenied { role: String, required: String },

    /// A newer login/logout replaced the session while this request was in flight.
    #[error("session changed while the request was in flight")]
    Superseded,

    #[error(transparent)]
    Identity(IdentityError),

    #[error("failed to persist credential: {0}")]
    CredentialStore(String),
}
