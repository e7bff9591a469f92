//! Role Types API

use std::sync::Arc;

use axum::{extract::Path, routing::get, Json, Router};
use uuid::Uuid;

use crate::resolver::{self, entity_routes};
use crate::role::entity::Role;
use crate::role_category::entity::RoleCategory;
use crate::role_type::entity::RoleType;
use crate::shared::error::Result;
use crate::shared::middleware::{AppState, RequestContext};

async fn get_roles(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Vec<Arc<Role>>>> {
    let role_type = resolver::require::<RoleType>(&ctx, id).await?;
    Ok(Json(role_type.roles(&ctx).await?))
}

async fn get_category(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Arc<RoleCategory>>>> {
    let role_type = resolver::require::<RoleType>(&ctx, id).await?;
    Ok(Json(role_type.category(&ctx).await?))
}

/// Create the role types router
pub fn role_types_router() -> Router<AppState> {
    entity_routes::<RoleType>()
        .route("/{id}/roles", get(get_roles))
        .route("/{id}/category", get(get_category))
}
