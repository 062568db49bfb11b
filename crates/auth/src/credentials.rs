//! Persisted session credential (a single opaque token).

use std::sync::{Mutex, PoisonError};

/// Storage for the session token.
///
/// The kernel only writes and clears the token; it never inspects it.
/// `clear` is infallible: implementations log failures instead of returning them.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<String>;

    fn store(&self, token: &str) -> std::io::Result<()>;

    fn clear(&self);
}

impl<T: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<T> {
    fn load(&self) -> Option<String> {
        (**self).load()
    }

    fn store(&self, token: &str) -> std::io::Result<()> {
        (**self).store(token)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// In-process credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn store(&self, token: &str) -> std::io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
