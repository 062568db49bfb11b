//! HTTP API application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use mall_auth::{FieldGates, PortalLayout, RouteGuard};

use crate::config::ApiConfig;
use crate::directory::UserDirectory;
use crate::middleware;
use crate::tokens::Hs256Tokens;

pub mod dto;
pub mod errors;
pub mod routes;

/// Everything the handlers share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<UserDirectory>,
    pub tokens: Arc<Hs256Tokens>,
    pub layout: Arc<PortalLayout>,
    pub guard: Arc<RouteGuard>,
    pub fields: Arc<FieldGates>,
}

impl AppState {
    pub fn new(
        directory: UserDirectory,
        layout: PortalLayout,
        jwt_secret: &str,
        token_ttl: chrono::Duration,
    ) -> anyhow::Result<Self> {
        layout.validate().context("portal layout is invalid")?;
        let guard = RouteGuard::from_layout(&layout).context("portal layout is invalid")?;
        let fields = FieldGates::new(&layout.fields);

        Ok(Self {
            directory: Arc::new(directory),
            tokens: Arc::new(Hs256Tokens::new(jwt_secret.as_bytes(), token_ttl)),
            layout: Arc::new(layout),
            guard: Arc::new(guard),
            fields: Arc::new(fields),
        })
    }

    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let directory = match &config.seed_file {
            Some(path) => UserDirectory::from_seed_file(path)
                .with_context(|| format!("failed to load seed accounts from {}", path.display()))?,
            None => UserDirectory::new(),
        };
        if directory.is_empty() {
            tracing::warn!("user directory is empty; nobody can log in");
        } else {
            tracing::info!(accounts = directory.len(), "user directory loaded");
        }

        let layout = match &config.layout_file {
            Some(path) => PortalLayout::load(path)
                .with_context(|| format!("failed to load portal layout from {}", path.display()))?,
            None => PortalLayout::mall_admin(),
        };

        Self::new(
            directory,
            layout,
            &config.jwt_secret,
            chrono::Duration::minutes(config.token_ttl_minutes),
        )
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    let auth_state = middleware::AuthState {
        tokens: state.tokens.clone(),
        directory: state.directory.clone(),
    };

    // Protected routes: require a bearer token for an active account.
    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(state)))
}
