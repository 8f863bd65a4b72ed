/// Membership lookup endpoints
///
/// Enumerations are served through the cache when one is configured; the
/// `*ttl` routes report how long the cached entry has left.
use super::{log_failure, validate_identifier};
use crate::{context::AppContext, error::LookupResult, lookup::Relation};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Remaining cache lifetime, `ttl = -1` when nothing is cached
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TtlResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub ttl: i64,
}

async fn members(ctx: &AppContext, relation: Relation, id: &str) -> LookupResult<Json<Vec<String>>> {
    let id = validate_identifier(id)?;
    ctx.lookup
        .members(&ctx.request_context(), relation, id, true)
        .await
        .map(Json)
        .inspect_err(|e| log_failure(relation.as_str(), id, e))
}

async fn remaining_ttl(
    ctx: &AppContext,
    relation: Relation,
    id: &str,
) -> LookupResult<Json<TtlResponse>> {
    let id = validate_identifier(id)?;
    let remaining = ctx
        .lookup
        .remaining_ttl(&ctx.request_context(), relation, id)
        .await
        .inspect_err(|e| log_failure("ttl", id, e))?;

    let ttl = remaining.map(|d| d.as_secs() as i64).unwrap_or(-1);
    let (gid, uid) = if relation.keyed_by_group() {
        (Some(id.to_string()), None)
    } else {
        (None, Some(id.to_string()))
    };

    Ok(Json(TtlResponse { gid, uid, ttl }))
}

pub async fn users_in_group(
    State(ctx): State<AppContext>,
    Path(gid): Path<String>,
) -> LookupResult<Json<Vec<String>>> {
    members(&ctx, Relation::GroupUsers, &gid).await
}

pub async fn user_groups(
    State(ctx): State<AppContext>,
    Path(uid): Path<String>,
) -> LookupResult<Json<Vec<String>>> {
    members(&ctx, Relation::UserGroups, &uid).await
}

pub async fn users_in_computing_group(
    State(ctx): State<AppContext>,
    Path(gid): Path<String>,
) -> LookupResult<Json<Vec<String>>> {
    members(&ctx, Relation::ComputingGroupUsers, &gid).await
}

pub async fn user_computing_groups(
    State(ctx): State<AppContext>,
    Path(uid): Path<String>,
) -> LookupResult<Json<Vec<String>>> {
    members(&ctx, Relation::UserComputingGroups, &uid).await
}

pub async fn users_in_group_ttl(
    State(ctx): State<AppContext>,
    Path(gid): Path<String>,
) -> LookupResult<Json<TtlResponse>> {
    remaining_ttl(&ctx, Relation::GroupUsers, &gid).await
}

pub async fn user_groups_ttl(
    State(ctx): State<AppContext>,
    Path(uid): Path<String>,
) -> LookupResult<Json<TtlResponse>> {
    remaining_ttl(&ctx, Relation::UserGroups, &uid).await
}

pub async fn users_in_computing_group_ttl(
    State(ctx): State<AppContext>,
    Path(gid): Path<String>,
) -> LookupResult<Json<TtlResponse>> {
    remaining_ttl(&ctx, Relation::ComputingGroupUsers, &gid).await
}

pub async fn user_computing_groups_ttl(
    State(ctx): State<AppContext>,
    Path(uid): Path<String>,
) -> LookupResult<Json<TtlResponse>> {
    remaining_ttl(&ctx, Relation::UserComputingGroups, &uid).await
}

/// Build membership routes
pub fn routes(computing_groups: bool) -> Router<AppContext> {
    let router = Router::new()
        .route("/api/v1/membership/usersingroup/:gid", get(users_in_group))
        .route("/api/v1/membership/usergroups/:uid", get(user_groups))
        .route("/api/v1/membership/usersingroupttl/:gid", get(users_in_group_ttl))
        .route("/api/v1/membership/usergroupsttl/:uid", get(user_groups_ttl));

    if !computing_groups {
        return router;
    }

    router
        .route(
            "/api/v1/membership/usersincomputinggroup/:gid",
            get(users_in_computing_group),
        )
        .route(
            "/api/v1/membership/usercomputinggroups/:uid",
            get(user_computing_groups),
        )
        .route(
            "/api/v1/membership/usersincomputinggroupttl/:gid",
            get(users_in_computing_group_ttl),
        )
        .route(
            "/api/v1/membership/usercomputinggroupsttl/:uid",
            get(user_computing_groups_ttl),
        )
}
