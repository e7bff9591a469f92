//! HTTP surface
//!
//! Mounts every entity router under `/api` and the health check at the root.

use axum::{body::Body, http::Request, Router};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::group::groups_router;
use crate::group_type::group_types_router;
use crate::membership::memberships_router;
use crate::role::roles_router;
use crate::role_category::role_categories_router;
use crate::role_type::role_types_router;
use crate::shared::health_api::health_router;
use crate::shared::middleware::{AppState, USER_ID_HEADER};
use crate::user::users_router;

/// Full application router, state applied.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/users", users_router())
        .nest("/api/groups", groups_router())
        .nest("/api/group-types", group_types_router())
        .nest("/api/role-categories", role_categories_router())
        .nest("/api/role-types", role_types_router())
        .nest("/api/roles", roles_router())
        .nest("/api/memberships", memberships_router())
        .merge(health_router())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

fn request_span(request: &Request<Body>) -> Span {
    let caller = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        caller = %caller,
    )
}
