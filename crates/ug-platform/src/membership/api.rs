//! Memberships API

use std::sync::Arc;

use axum::{extract::Path, routing::get, Json, Router};
use uuid::Uuid;

use crate::group::entity::Group;
use crate::membership::entity::Membership;
use crate::resolver::{self, entity_routes};
use crate::shared::error::Result;
use crate::shared::middleware::{AppState, RequestContext};
use crate::user::entity::User;

async fn get_user(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Option<Arc<User>>>> {
    let membership = resolver::require::<Membership>(&ctx, id).await?;
    Ok(Json(membership.user(&ctx).await?))
}

async fn get_group(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Option<Arc<Group>>>> {
    let membership = resolver::require::<Membership>(&ctx, id).await?;
    Ok(Json(membership.group(&ctx).await?))
}

/// Create the memberships router
pub fn memberships_router() -> Router<AppState> {
    entity_routes::<Membership>()
        .route("/{id}/user", get(get_user))
        .route("/{id}/group", get(get_group))
}
