use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use mall_auth::Principal;

use crate::app::errors::json_error;
use crate::context::PrincipalContext;
use crate::directory::UserDirectory;
use crate::tokens::Hs256Tokens;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<Hs256Tokens>,
    pub directory: Arc<UserDirectory>,
}

/// Resolve the bearer token to an active principal, or answer 401.
///
/// The account is re-read on every request, so deactivation and role changes
/// apply to tokens that are already out.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match resolve(&state, req.headers()) {
        Ok(principal) => {
            req.extensions_mut().insert(PrincipalContext::new(principal));
            next.run(req).await
        }
        Err(reason) => {
            tracing::debug!(reason, "request rejected by auth middleware");
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", reason)
        }
    }
}

fn resolve(state: &AuthState, headers: &HeaderMap) -> Result<Principal, &'static str> {
    let token = extract_bearer(headers).ok_or("missing bearer token")?;

    let claims = state
        .tokens
        .validate(token, Utc::now())
        .map_err(|_| "invalid or expired token")?;

    let record = state.directory.get(claims.sub).ok_or("unknown account")?;

    Principal::try_from(record).map_err(|_| "account cannot be used")
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() { None } else { Some(token) }
}
