use std::sync::Arc;

use mall_auth::{Principal, SessionState};

/// Principal context for a request (authenticated, active identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Arc<Principal>,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: Arc::new(principal),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The request's principal as a resolved session snapshot.
    pub fn session(&self) -> SessionState {
        SessionState::Resolved(self.principal.clone())
    }
}
