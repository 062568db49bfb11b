use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod portal;
pub mod system;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new().route("/auth/login", post(auth::login))
}

/// Router for all authenticated endpoints.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .nest("/portal", portal::router())
}
