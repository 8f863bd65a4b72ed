/// Bulk cache refresh endpoints
///
/// Each call starts a background batch and answers 202 right away.
use super::validate_identifier;
use crate::{
    context::AppContext,
    error::{LookupError, LookupResult},
    lookup::Relation,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct GroupsRequest {
    pub groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsersRequest {
    pub users: Vec<String>,
}

fn start(ctx: &AppContext, relation: Relation, ids: Vec<String>) -> LookupResult<StatusCode> {
    if ids.is_empty() {
        return Err(LookupError::Validation(
            "At least one identifier is required".to_string(),
        ));
    }
    // Blank entries are skipped by the refresher; anything else must be valid
    for id in ids.iter().filter(|id| !id.trim().is_empty()) {
        validate_identifier(id)?;
    }

    info!("Scheduling refresh of {} {} entries", ids.len(), relation);
    // Detached: the batch keeps running after the response is sent
    drop(ctx.refresher.spawn(relation, ids));
    Ok(StatusCode::ACCEPTED)
}

pub async fn refresh_users_in_group(
    State(ctx): State<AppContext>,
    Json(req): Json<GroupsRequest>,
) -> LookupResult<StatusCode> {
    start(&ctx, Relation::GroupUsers, req.groups)
}

pub async fn refresh_user_groups(
    State(ctx): State<AppContext>,
    Json(req): Json<UsersRequest>,
) -> LookupResult<StatusCode> {
    start(&ctx, Relation::UserGroups, req.users)
}

pub async fn refresh_users_in_computing_group(
    State(ctx): State<AppContext>,
    Json(req): Json<GroupsRequest>,
) -> LookupResult<StatusCode> {
    start(&ctx, Relation::ComputingGroupUsers, req.groups)
}

pub async fn refresh_user_computing_groups(
    State(ctx): State<AppContext>,
    Json(req): Json<UsersRequest>,
) -> LookupResult<StatusCode> {
    start(&ctx, Relation::UserComputingGroups, req.users)
}

/// Build refresh routes
pub fn routes(computing_groups: bool) -> Router<AppContext> {
    let router = Router::new()
        .route("/api/v1/update/usersingroup", post(refresh_users_in_group))
        .route("/api/v1/update/usergroups", post(refresh_user_groups));

    if !computing_groups {
        return router;
    }

    router
        .route(
            "/api/v1/update/usersincomputinggroup",
            post(refresh_users_in_computing_group),
        )
        .route(
            "/api/v1/update/usercomputinggroups",
            post(refresh_user_computing_groups),
        )
}
