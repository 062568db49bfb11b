use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use mall_auth::{Credentials, LoginResponse, Principal, PrincipalRecord};

use crate::app::{AppState, errors};
use crate::context::PrincipalContext;

pub async fn login(
    Extension(state): Extension<AppState>,
    Json(body): Json<Credentials>,
) -> axum::response::Response {
    let Some(identifier) = body.identifier() else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "exactly one of email or phone is required",
        );
    };

    let rejected = || errors::json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid credentials");

    let Some(record) = state.directory.authenticate(&identifier, &body.password) else {
        tracing::info!(?identifier, "login rejected");
        return rejected();
    };

    // Inactive accounts and unusable roles fail here, same as on /auth/me.
    let principal = match Principal::try_from(record) {
        Ok(p) => p,
        Err(e) => {
            tracing::info!(?identifier, reason = %e, "login rejected");
            return rejected();
        }
    };

    let token = match state.tokens.issue(principal.id, Utc::now()) {
        Ok(t) => t,
        Err(e) => return errors::token_error_to_response(e),
    };

    tracing::info!(user = %principal.id, role = %principal.role_name, "login succeeded");

    (
        StatusCode::OK,
        Json(LoginResponse {
            token,
            principal: PrincipalRecord::from(&principal),
        }),
    )
        .into_response()
}

pub async fn me(Extension(ctx): Extension<PrincipalContext>) -> Json<PrincipalRecord> {
    Json(PrincipalRecord::from(ctx.principal()))
}
