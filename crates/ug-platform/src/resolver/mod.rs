//! Field Resolvers
//!
//! Small generic building blocks every entity kind is composed from. Each
//! one asks the policy first, then the request's loader for the kind.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::loader::RegisteredEntity;
use crate::shared::api_common::{MutationResult, PageQuery};
use crate::shared::authorization_service::{FieldDescriptor, Resource};
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::{AppState, RequestContext};
use crate::store::{InsertInput, SqlValue, UpdateInput, UpdateOutcome, WhereFilter};

/// One entity by key; `None` when absent.
pub async fn resolve_by_id<E: RegisteredEntity>(
    ctx: &RequestContext,
    id: Uuid,
) -> Result<Option<Arc<E>>> {
    ctx.authorize(
        &FieldDescriptor::read(E::KIND, "by_id"),
        Some(&Resource { kind: E::KIND, id }),
    )?;
    ctx.loaders().get::<E>().load(id).await
}

/// Follow a nullable reference to another entity.
pub async fn resolve_reference<E: RegisteredEntity>(
    ctx: &RequestContext,
    field: &'static str,
    id: Option<Uuid>,
) -> Result<Option<Arc<E>>> {
    let Some(id) = id else {
        return Ok(None);
    };
    ctx.authorize(
        &FieldDescriptor::read(E::KIND, field),
        Some(&Resource { kind: E::KIND, id }),
    )?;
    ctx.loaders().get::<E>().load(id).await
}

/// A page of entities, optionally filtered.
pub async fn resolve_page<E: RegisteredEntity>(
    ctx: &RequestContext,
    skip: i64,
    limit: i64,
    filter: Option<&WhereFilter>,
) -> Result<Vec<Arc<E>>> {
    ctx.authorize(&FieldDescriptor::list(E::KIND, "page"), None)?;
    ctx.loaders().get::<E>().page(skip, limit, filter).await
}

/// All entities with `field = value`, e.g. the roles of one user.
pub async fn resolve_by_filter<E: RegisteredEntity>(
    ctx: &RequestContext,
    relation: &'static str,
    field: &str,
    value: impl Into<SqlValue>,
) -> Result<Vec<Arc<E>>> {
    ctx.authorize(&FieldDescriptor::list(E::KIND, relation), None)?;
    ctx.loaders().get::<E>().filter_by(field, value).await
}

/// Insert, stamping the caller as `createdby`.
pub async fn insert<E: RegisteredEntity>(
    ctx: &RequestContext,
    mut input: E::Insert,
) -> Result<Arc<E>> {
    ctx.authorize(&FieldDescriptor::write(E::KIND, "insert"), None)?;
    if let Some(actor) = ctx.caller_id() {
        input.stamp(actor);
    }
    ctx.loaders().get::<E>().insert(input).await
}

/// Update, stamping the caller as `changedby`.
pub async fn update<E: RegisteredEntity>(
    ctx: &RequestContext,
    mut input: E::Update,
) -> Result<UpdateOutcome<Arc<E>>> {
    ctx.authorize(
        &FieldDescriptor::write(E::KIND, "update"),
        Some(&Resource { kind: E::KIND, id: input.id() }),
    )?;
    if let Some(actor) = ctx.caller_id() {
        input.stamp(actor);
    }
    ctx.loaders().get::<E>().update(input).await
}

/// Load a parent entity or fail with 404; used by relation endpoints.
pub async fn require<E: RegisteredEntity>(ctx: &RequestContext, id: Uuid) -> Result<Arc<E>> {
    resolve_by_id::<E>(ctx, id)
        .await?
        .ok_or_else(|| PlatformError::not_found(E::KIND.as_str(), id.to_string()))
}

async fn get_by_id<E: RegisteredEntity>(
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Arc<E>>> {
    Ok(Json(require::<E>(&ctx, id).await?))
}

async fn get_page<E: RegisteredEntity>(
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Arc<E>>>> {
    let filter = query.filter::<E>()?;
    let rows = resolve_page::<E>(&ctx, query.skip(), query.limit(), filter.as_ref()).await?;
    Ok(Json(rows))
}

async fn post_insert<E: RegisteredEntity>(
    ctx: RequestContext,
    Json(input): Json<E::Insert>,
) -> Result<Json<MutationResult<Arc<E>>>> {
    let row = insert::<E>(&ctx, input).await?;
    Ok(Json(MutationResult::ok(row.id(), row)))
}

async fn put_update<E: RegisteredEntity>(
    ctx: RequestContext,
    Json(input): Json<E::Update>,
) -> Result<Json<MutationResult<Arc<E>>>> {
    let id = input.id();
    let outcome = update::<E>(&ctx, input).await?;
    Ok(Json(MutationResult::from_outcome(id, outcome)))
}

/// `GET /` page, `POST /` insert, `PUT /` update, `GET /{id}` by key.
pub fn entity_routes<E: RegisteredEntity>() -> Router<AppState> {
    Router::new()
        .route("/", get(get_page::<E>).post(post_insert::<E>).put(put_update::<E>))
        .route("/{id}", get(get_by_id::<E>))
}
