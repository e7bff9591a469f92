//! Roles API

use std::sync::Arc;

use axum::{extract::Path, routing::get, Json, Router};
use uuid::Uuid;

use crate::group::entity::Group;
use crate::resolver::{self, entity_routes};
use crate::role::entity::Role;
use crate::role_type::entity::RoleType;
use crate::shared::error::Result;
use crate::shared::middleware::{AppState, RequestContext};
use crate::user::entity::User;

/// Roles held by a user
pub async fn by_user(ctx: &RequestContext, user_id: Uuid) -> Result<Vec<Arc<Role>>> {
    resolver::resolve_by_filter::<Role>(ctx, "by_user", "user_id", user_id).await
}

/// Roles held on a group
pub async fn on_group(ctx: &RequestContext, group_id: Uuid) -> Result<Vec<Arc<Role>>> {
    resolver::resolve_by_filter::<Role>(ctx, "on_group", "group_id", group_id).await
}

async fn get_by_user(
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Arc<Role>>>> {
    Ok(Json(by_user(&ctx, user_id).await?))
}

async fn get_on_group(
    ctx: RequestContext,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<Arc<Role>>>> {
    Ok(Json(on_group(&ctx, group_id).await?))
}

async fn get_user(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Option<Arc<User>>>> {
    let role = resolver::require::<Role>(&ctx, id).await?;
    Ok(Json(role.user(&ctx).await?))
}

async fn get_group(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Option<Arc<Group>>>> {
    let role = resolver::require::<Role>(&ctx, id).await?;
    Ok(Json(role.group(&ctx).await?))
}

async fn get_roletype(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Arc<RoleType>>>> {
    let role = resolver::require::<Role>(&ctx, id).await?;
    Ok(Json(role.roletype(&ctx).await?))
}

/// Create the roles router
pub fn roles_router() -> Router<AppState> {
    entity_routes::<Role>()
        .route("/by-user/{user_id}", get(get_by_user))
        .route("/on-group/{group_id}", get(get_on_group))
        .route("/{id}/user", get(get_user))
        .route("/{id}/group", get(get_group))
        .route("/{id}/roletype", get(get_roletype))
}
