use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use mall_auth::{ShopScope, expanded_group, filter_menu};

use crate::app::{AppState, dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/menu", get(menu))
        .route("/route", get(route))
        .route("/fields", get(fields))
        .route("/explain", get(explain))
}

pub async fn menu(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(query): Query<dto::MenuQuery>,
) -> Json<dto::MenuResponse> {
    let menu = filter_menu(&state.layout.menu, Some(ctx.principal()));
    let expanded = query
        .path
        .as_deref()
        .and_then(|path| expanded_group(&menu, path))
        .map(str::to_string);

    Json(dto::MenuResponse { menu, expanded })
}

pub async fn route(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(query): Query<dto::PathQuery>,
) -> Json<dto::RouteResponse> {
    let decision = state.guard.check(&query.path, &ctx.session());
    Json(dto::RouteResponse {
        path: query.path,
        decision,
    })
}

pub async fn fields(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Json<dto::FieldsResponse> {
    let principal = ctx.principal();
    Json(dto::FieldsResponse {
        role: principal.role_name.to_string(),
        fields: state.fields.visible(Some(principal)),
        shop_scope: ShopScope::for_principal(Some(principal)),
    })
}

pub async fn explain(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(query): Query<dto::PathQuery>,
) -> axum::response::Response {
    match state.guard.explain(&query.path, Some(ctx.principal())) {
        Some(explanation) => (StatusCode::OK, Json(explanation)).into_response(),
        None => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no route declared for {}", query.path),
        ),
    }
}
