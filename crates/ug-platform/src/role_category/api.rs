//! Role Categories API

use std::sync::Arc;

use axum::{extract::Path, routing::get, Json, Router};
use uuid::Uuid;

use crate::resolver::{self, entity_routes};
use crate::role_category::entity::RoleCategory;
use crate::role_type::entity::RoleType;
use crate::shared::error::Result;
use crate::shared::middleware::{AppState, RequestContext};

async fn get_role_types(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Arc<RoleType>>>> {
    let category = resolver::require::<RoleCategory>(&ctx, id).await?;
    Ok(Json(category.role_types(&ctx).await?))
}

/// Create the role categories router
pub fn role_categories_router() -> Router<AppState> {
    entity_routes::<RoleCategory>().route("/{id}/role-types", get(get_role_types))
}
