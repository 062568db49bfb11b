//! Principal resolution: the session lifecycle behind every guard and menu.
//!
//! The resolver owns the `loading -> resolved -> absent` state, publishes it on
//! a `watch` channel and is the only place that touches the persisted
//! credential. Callers read [`SessionState`] snapshots; nothing here is global.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::{AuthError, CredentialStore, Credentials, IdentityError, IdentityProvider, Principal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Resolved(Arc<Principal>),
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Loading,
    Resolved,
    Absent,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Resolved(_) => SessionStatus::Resolved,
            SessionState::Absent => SessionStatus::Absent,
        }
    }

    /// The principal, only once resolved.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::Resolved(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }
}

/// Resolves and tracks the current principal.
///
/// Every transition bumps an epoch. A login or bootstrap result is applied
/// only if no newer transition started while it was in flight; otherwise it
/// is dropped (the request itself is not cancelled).
pub struct SessionResolver<P, S> {
    provider: P,
    store: S,
    state: watch::Sender<SessionState>,
    epoch: Mutex<u64>,
}

impl<P, S> SessionResolver<P, S>
where
    P: IdentityProvider,
    S: CredentialStore,
{
    /// Starts in [`SessionState::Loading`] until [`Self::bootstrap`] settles.
    pub fn new(provider: P, store: S) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            provider,
            store,
            state,
            epoch: Mutex::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Hydrate the session from the persisted credential.
    ///
    /// A rejected credential is cleared. An unreachable or misbehaving identity
    /// service settles to absent but keeps the credential for the next attempt.
    pub async fn bootstrap(&self) -> SessionState {
        let ticket = self.begin();
        if let Err(err) = self.resolve_stored(ticket, true).await {
            tracing::debug!(error = %err, "session bootstrap did not resolve a principal");
        }
        self.state()
    }

    /// Re-check the persisted credential after bootstrap.
    ///
    /// Does not pass through `Loading`. A rejected credential demotes the
    /// session to absent and yields [`AuthError::SessionExpired`]; a transport
    /// failure leaves the current state untouched.
    pub async fn revalidate(&self) -> Result<Arc<Principal>, AuthError> {
        let ticket = *self.lock_epoch();
        self.resolve_stored(ticket, false).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Arc<Principal>, AuthError> {
        if credentials.identifier().is_none() {
            return Err(AuthError::Authentication(
                "exactly one of email or phone is required".to_string(),
            ));
        }

        let ticket = self.begin();

        let response = match self.provider.login(credentials).await {
            Ok(response) => response,
            Err(err) => {
                self.reject(ticket)?;
                return Err(match err {
                    IdentityError::InvalidCredentials | IdentityError::Unauthorized => {
                        tracing::info!("login rejected");
                        AuthError::Authentication(err.to_string())
                    }
                    other => {
                        tracing::warn!(error = %other, "login failed");
                        AuthError::Identity(other)
                    }
                });
            }
        };

        let principal = match Principal::try_from(response.principal) {
            Ok(p) => Arc::new(p),
            Err(err) => {
                self.reject(ticket)?;
                return Err(AuthError::Authentication(err.to_string()));
            }
        };

        let token = response.token;
        let persisted = self
            .commit(ticket, |store| match store.store(&token) {
                Ok(()) => (SessionState::Resolved(principal.clone()), Ok(())),
                Err(e) => (
                    SessionState::Absent,
                    Err(AuthError::CredentialStore(e.to_string())),
                ),
            })
            .ok_or(AuthError::Superseded)?;
        persisted?;

        tracing::info!(user = %principal.id, role = %principal.role_name, "logged in");
        Ok(principal)
    }

    /// Drop the principal and the persisted credential. Always succeeds.
    pub fn logout(&self) {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        self.store.clear();
        self.state.send_replace(SessionState::Absent);
        tracing::info!("logged out");
    }

    async fn resolve_stored(
        &self,
        ticket: u64,
        settle_on_transport: bool,
    ) -> Result<Arc<Principal>, AuthError> {
        let Some(token) = self.store.load() else {
            self.commit(ticket, |_| (SessionState::Absent, ()));
            return Err(AuthError::NotAuthenticated);
        };

        let record = match self.provider.me(&token).await {
            Ok(record) => record,
            // Neither says anything about the credential itself; keep it.
            Err(err @ (IdentityError::Transport(_) | IdentityError::Malformed(_))) => {
                tracing::warn!(error = %err, "identity service unavailable");
                if settle_on_transport {
                    self.commit(ticket, |_| (SessionState::Absent, ()));
                }
                return Err(AuthError::Identity(err));
            }
            Err(err) => {
                tracing::warn!(error = %err, "session credential rejected");
                return Err(self.expire(ticket));
            }
        };

        match Principal::try_from(record) {
            Ok(p) => {
                let p = Arc::new(p);
                self.commit(ticket, |_| (SessionState::Resolved(p.clone()), ()))
                    .ok_or(AuthError::Superseded)?;
                tracing::debug!(user = %p.id, role = %p.role_name, "session resolved");
                Ok(p)
            }
            Err(err) => {
                tracing::warn!(error = %err, "identity record refused");
                Err(self.expire(ticket))
            }
        }
    }

    /// Settle a failed login: drop the credential unless a newer transition won.
    fn reject(&self, ticket: u64) -> Result<(), AuthError> {
        self.commit(ticket, |store| {
            store.clear();
            (SessionState::Absent, ())
        })
        .ok_or(AuthError::Superseded)
    }

    fn expire(&self, ticket: u64) -> AuthError {
        let committed = self.commit(ticket, |store| {
            store.clear();
            (SessionState::Absent, ())
        });
        match committed {
            Some(()) => AuthError::SessionExpired,
            None => AuthError::Superseded,
        }
    }

    fn begin(&self) -> u64 {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        self.state.send_replace(SessionState::Loading);
        *epoch
    }

    fn commit<T>(&self, ticket: u64, apply: impl FnOnce(&S) -> (SessionState, T)) -> Option<T> {
        let epoch = self.lock_epoch();
        if *epoch != ticket {
            tracing::debug!(ticket, current = *epoch, "discarding stale session result");
            return None;
        }

        let (next, out) = apply(&self.store);
        self.state.send_replace(next);
        Some(out)
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::{
        GuardDecision, InMemoryCredentialStore, LoginResponse, MenuNode, PortalLayout,
        PrincipalRecord, RoleField, RouteGuard, filter_menu,
    };
    use mall_core::UserId;

    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    #[derive(Default)]
    struct FakeIdentity {
        accounts: HashMap<String, (String, PrincipalRecord)>,
        tokens: Mutex<HashMap<String, PrincipalRecord>>,
        gate: Option<Arc<Gate>>,
    }

    impl FakeIdentity {
        fn with_account(mut self, email: &str, password: &str, role: &str) -> Self {
            self.accounts.insert(email.to_string(), (password.to_string(), record(role, true)));
            self
        }

        fn with_token(self, token: &str, record: PrincipalRecord) -> Self {
            self.tokens.lock().unwrap().insert(token.to_string(), record);
            self
        }

        fn gated(mut self, gate: Arc<Gate>) -> Self {
            self.gate = Some(gate);
            self
        }

        async fn pass_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, IdentityError> {
            self.pass_gate().await;
            let email = credentials.email.clone().unwrap_or_default();
            match self.accounts.get(&email) {
                Some((password, record)) if *password == credentials.password => {
                    let token = format!("token-{email}");
                    self.tokens.lock().unwrap().insert(token.clone(), record.clone());
                    Ok(LoginResponse {
                        token,
                        principal: record.clone(),
                    })
                }
                _ => Err(IdentityError::InvalidCredentials),
            }
        }

        async fn me(&self, token: &str) -> Result<PrincipalRecord, IdentityError> {
            self.pass_gate().await;
            match token {
                "unreachable" => return Err(IdentityError::Transport("connection refused".to_string())),
                "garbled" => return Err(IdentityError::Malformed("expected value".to_string())),
                _ => {}
            }
            self.tokens
                .lock()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or(IdentityError::Unauthorized)
        }
    }

    fn record(role: &str, active: bool) -> PrincipalRecord {
        PrincipalRecord {
            id: UserId::new(),
            role: RoleField::Name(role.to_string()),
            shop_id: None,
            is_active: active,
            is_email_verified: true,
            email: None,
            phone: None,
            name: None,
        }
    }

    fn resolver(
        identity: FakeIdentity,
        store: Arc<InMemoryCredentialStore>,
    ) -> SessionResolver<FakeIdentity, Arc<InMemoryCredentialStore>> {
        SessionResolver::new(identity, store)
    }

    #[tokio::test]
    async fn starts_loading_and_settles_absent_without_credential() {
        let resolver = resolver(FakeIdentity::default(), Arc::new(InMemoryCredentialStore::new()));
        assert!(resolver.state().is_loading());

        let state = resolver.bootstrap().await;
        assert_eq!(state, SessionState::Absent);
    }

    #[tokio::test]
    async fn bootstrap_resolves_persisted_credential() {
        let identity = FakeIdentity::default().with_token("t1", record("mallAdmin", true));
        let store = Arc::new(InMemoryCredentialStore::with_token("t1"));
        let resolver = resolver(identity, store);

        let state = resolver.bootstrap().await;
        assert_eq!(state.status(), SessionStatus::Resolved);
        assert_eq!(state.principal().unwrap().role_name.as_str(), "mallAdmin");
    }

    #[tokio::test]
    async fn rejected_credential_is_cleared() {
        let store = Arc::new(InMemoryCredentialStore::with_token("expired"));
        let resolver = resolver(FakeIdentity::default(), store.clone());

        assert_eq!(resolver.bootstrap().await, SessionState::Absent);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn inactive_account_is_cleared() {
        let identity = FakeIdentity::default().with_token("t1", record("Sales", false));
        let store = Arc::new(InMemoryCredentialStore::with_token("t1"));
        let resolver = resolver(identity, store.clone());

        assert_eq!(resolver.bootstrap().await, SessionState::Absent);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn unreachable_service_keeps_credential() {
        let store = Arc::new(InMemoryCredentialStore::with_token("unreachable"));
        let resolver = resolver(FakeIdentity::default(), store.clone());

        assert_eq!(resolver.bootstrap().await, SessionState::Absent);
        assert_eq!(store.load().as_deref(), Some("unreachable"));
    }

    #[tokio::test]
    async fn unreadable_identity_answer_keeps_credential() {
        let store = Arc::new(InMemoryCredentialStore::with_token("garbled"));
        let resolver = resolver(FakeIdentity::default(), store.clone());

        assert_eq!(resolver.bootstrap().await, SessionState::Absent);
        assert_eq!(store.load().as_deref(), Some("garbled"));
    }

    #[tokio::test]
    async fn invalid_login_surfaces_authentication_error() {
        let identity = FakeIdentity::default().with_account("fin@mall.example", "right", "Finance");
        let resolver = resolver(identity, Arc::new(InMemoryCredentialStore::new()));

        let err = resolver
            .login(&Credentials::with_email("fin@mall.example", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Authentication(_)));
        assert_eq!(resolver.state(), SessionState::Absent);
    }

    #[tokio::test]
    async fn login_requires_an_identifier() {
        let resolver = resolver(FakeIdentity::default(), Arc::new(InMemoryCredentialStore::new()));
        let creds = Credentials {
            email: None,
            phone: None,
            password: "pw".to_string(),
        };
        assert!(matches!(resolver.login(&creds).await, Err(AuthError::Authentication(_))));
    }

    #[tokio::test]
    async fn login_is_reflected_by_next_menu_filter() {
        let identity = FakeIdentity::default().with_account("fin@mall.example", "pw", "Finance");
        let store = Arc::new(InMemoryCredentialStore::new());
        let resolver = resolver(identity, store.clone());
        let layout = PortalLayout::mall_admin();

        resolver.bootstrap().await;
        assert!(filter_menu(&layout.menu, resolver.state().principal()).is_empty());

        resolver
            .login(&Credentials::with_email("fin@mall.example", "pw"))
            .await
            .unwrap();

        let state = resolver.state();
        let menu = filter_menu(&layout.menu, state.principal());
        let labels: Vec<&str> = menu.iter().map(MenuNode::label).collect();
        assert_eq!(labels, vec!["Dashboard", "Billing"]);
        assert_eq!(store.load().as_deref(), Some("token-fin@mall.example"));
    }

    #[tokio::test]
    async fn guard_waits_while_resolution_is_in_flight() {
        let gate = Arc::new(Gate::default());
        let identity = FakeIdentity::default()
            .with_token("t1", record("superAdmin", true))
            .gated(gate.clone());
        let resolver = Arc::new(resolver(identity, Arc::new(InMemoryCredentialStore::with_token("t1"))));
        let guard = RouteGuard::from_layout(&PortalLayout::mall_admin()).unwrap();

        let task = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.bootstrap().await })
        };

        gate.entered.notified().await;
        assert_eq!(guard.check("/roles", &resolver.state()), GuardDecision::Loading);

        gate.release.notify_one();
        task.await.unwrap();
        assert!(guard.check("/roles", &resolver.state()).is_allowed());
    }

    #[tokio::test]
    async fn logout_during_login_discards_the_result() {
        let gate = Arc::new(Gate::default());
        let identity = FakeIdentity::default()
            .with_account("ops@mall.example", "pw", "superAdmin")
            .gated(gate.clone());
        let store = Arc::new(InMemoryCredentialStore::new());
        let resolver = Arc::new(resolver(identity, store.clone()));

        let task = {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                resolver
                    .login(&Credentials::with_email("ops@mall.example", "pw"))
                    .await
            })
        };

        gate.entered.notified().await;
        resolver.logout();
        gate.release.notify_one();

        assert_eq!(task.await.unwrap(), Err(AuthError::Superseded));
        assert_eq!(resolver.state(), SessionState::Absent);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn stale_failed_login_leaves_newer_credential_alone() {
        let gate = Arc::new(Gate::default());
        let identity = FakeIdentity::default()
            .with_account("ops@mall.example", "pw", "superAdmin")
            .gated(gate.clone());
        let store = Arc::new(InMemoryCredentialStore::new());
        let resolver = Arc::new(resolver(identity, store.clone()));

        let task = {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                resolver
                    .login(&Credentials::with_email("ops@mall.example", "wrong"))
                    .await
            })
        };

        gate.entered.notified().await;
        resolver.logout();
        store.store("newer-session").unwrap();
        gate.release.notify_one();

        assert_eq!(task.await.unwrap(), Err(AuthError::Superseded));
        assert_eq!(store.load().as_deref(), Some("newer-session"));
    }

    #[tokio::test]
    async fn logout_is_unconditional() {
        let store = Arc::new(InMemoryCredentialStore::with_token("whatever"));
        let resolver = resolver(FakeIdentity::default(), store.clone());

        resolver.logout();
        resolver.logout();

        assert_eq!(resolver.state(), SessionState::Absent);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn revalidate_reports_expired_session() {
        let identity = FakeIdentity::default().with_token("t1", record("Sales", true));
        let store = Arc::new(InMemoryCredentialStore::with_token("t1"));
        let resolver = resolver(identity, store.clone());
        resolver.bootstrap().await;

        resolver.provider.tokens.lock().unwrap().clear();

        assert_eq!(resolver.revalidate().await, Err(AuthError::SessionExpired));
        assert_eq!(resolver.state(), SessionState::Absent);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let identity = FakeIdentity::default().with_account("s@mall.example", "pw", "Sales");
        let resolver = resolver(identity, Arc::new(InMemoryCredentialStore::new()));
        let mut rx = resolver.subscribe();

        resolver
            .login(&Credentials::with_email("s@mall.example", "pw"))
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status(), SessionStatus::Resolved);

        resolver.logout();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Absent);
    }
}
