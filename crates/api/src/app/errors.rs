use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::tokens::TokenError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn token_error_to_response(err: TokenError) -> axum::response::Response {
    tracing::error!(error = %err, "failed to issue session token");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "could not issue session token")
}
