//! Group Types API

use std::sync::Arc;

use axum::{extract::Path, routing::get, Json, Router};
use uuid::Uuid;

use crate::group::entity::Group;
use crate::group_type::entity::GroupType;
use crate::resolver::{self, entity_routes};
use crate::shared::error::Result;
use crate::shared::middleware::{AppState, RequestContext};

async fn get_groups(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Vec<Arc<Group>>>> {
    let group_type = resolver::require::<GroupType>(&ctx, id).await?;
    Ok(Json(group_type.groups(&ctx).await?))
}

/// Create the group types router
pub fn group_types_router() -> Router<AppState> {
    entity_routes::<GroupType>().route("/{id}/groups", get(get_groups))
}
