//! Users API
//!
//! Standard entity routes plus `me`, the by-letters search and the
//! membership / role relations.

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::membership::entity::Membership;
use crate::resolver::{self, entity_routes};
use crate::role::entity::Role;
use crate::shared::api_common::LettersQuery;
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::{AppState, RequestContext};
use crate::store::WhereFilter;
use crate::user::entity::User;

/// Searches shorter than this return nothing.
pub const MIN_LETTERS: usize = 3;

/// The user behind the current request
pub async fn me(ctx: &RequestContext) -> Result<Arc<User>> {
    let id = ctx
        .caller_id()
        .ok_or_else(|| PlatformError::unauthorized("authentication required"))?;
    resolver::require::<User>(ctx, id).await
}

/// Users whose name, surname or email contains `letters`, case-insensitive.
pub async fn by_letters(ctx: &RequestContext, letters: &str, limit: i64) -> Result<Vec<Arc<User>>> {
    let letters = letters.trim();
    if letters.chars().count() < MIN_LETTERS {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", letters);
    let filter = WhereFilter::Or(vec![
        WhereFilter::ilike::<User>("name", pattern.as_str())?,
        WhereFilter::ilike::<User>("surname", pattern.as_str())?,
        WhereFilter::ilike::<User>("email", pattern)?,
    ]);
    resolver::resolve_page::<User>(ctx, 0, limit, Some(&filter)).await
}

async fn get_me(ctx: RequestContext) -> Result<Json<Arc<User>>> {
    Ok(Json(me(&ctx).await?))
}

async fn get_by_letters(
    ctx: RequestContext,
    Query(query): Query<LettersQuery>,
) -> Result<Json<Vec<Arc<User>>>> {
    Ok(Json(by_letters(&ctx, &query.letters, query.limit()).await?))
}

async fn get_memberships(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Arc<Membership>>>> {
    let user = resolver::require::<User>(&ctx, id).await?;
    Ok(Json(user.memberships(&ctx).await?))
}

async fn get_roles(ctx: RequestContext, Path(id): Path<Uuid>) -> Result<Json<Vec<Arc<Role>>>> {
    let user = resolver::require::<User>(&ctx, id).await?;
    Ok(Json(user.roles(&ctx).await?))
}

/// Create the users router
pub fn users_router() -> Router<AppState> {
    entity_routes::<User>()
        .route("/me", get(get_me))
        .route("/by-letters", get(get_by_letters))
        .route("/{id}/memberships", get(get_memberships))
        .route("/{id}/roles", get(get_roles))
}
