//! Groups API

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::group::entity::Group;
use crate::group_type::entity::GroupType;
use crate::membership::entity::Membership;
use crate::resolver::{self, entity_routes};
use crate::role::entity::Role;
use crate::shared::api_common::LettersQuery;
use crate::shared::error::Result;
use crate::shared::middleware::{AppState, RequestContext};
use crate::store::WhereFilter;
use crate::user::api::MIN_LETTERS;
use crate::user::entity::User;

/// Groups whose name contains `letters`, case-insensitive.
pub async fn by_letters(
    ctx: &RequestContext,
    letters: &str,
    limit: i64,
) -> Result<Vec<Arc<Group>>> {
    let letters = letters.trim();
    if letters.chars().count() < MIN_LETTERS {
        return Ok(Vec::new());
    }

    let filter = WhereFilter::ilike::<Group>("name", format!("%{}%", letters))?;
    resolver::resolve_page::<Group>(ctx, 0, limit, Some(&filter)).await
}

async fn get_by_letters(
    ctx: RequestContext,
    Query(query): Query<LettersQuery>,
) -> Result<Json<Vec<Arc<Group>>>> {
    Ok(Json(by_letters(&ctx, &query.letters, query.limit()).await?))
}

async fn get_memberships(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Arc<Membership>>>> {
    let group = resolver::require::<Group>(&ctx, id).await?;
    Ok(Json(group.memberships(&ctx).await?))
}

async fn get_roles(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Vec<Arc<Role>>>> {
    let group = resolver::require::<Group>(&ctx, id).await?;
    Ok(Json(group.roles(&ctx).await?))
}

async fn get_subgroups(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Vec<Arc<Group>>>> {
    let group = resolver::require::<Group>(&ctx, id).await?;
    Ok(Json(group.subgroups(&ctx).await?))
}

async fn get_mastergroup(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Arc<Group>>>> {
    let group = resolver::require::<Group>(&ctx, id).await?;
    Ok(Json(group.mastergroup(&ctx).await?))
}

async fn get_grouptype(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Arc<GroupType>>>> {
    let group = resolver::require::<Group>(&ctx, id).await?;
    Ok(Json(group.grouptype(&ctx).await?))
}

async fn get_members(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Vec<Arc<User>>>> {
    let group = resolver::require::<Group>(&ctx, id).await?;
    Ok(Json(group.members(&ctx).await?))
}

/// Create the groups router
pub fn groups_router() -> Router<AppState> {
    entity_routes::<Group>()
        .route("/by-letters", get(get_by_letters))
        .route("/{id}/memberships", get(get_memberships))
        .route("/{id}/roles", get(get_roles))
        .route("/{id}/subgroups", get(get_subgroups))
        .route("/{id}/mastergroup", get(get_mastergroup))
        .route("/{id}/grouptype", get(get_grouptype))
        .route("/{id}/members", get(get_members))
}
