/// Free-text directory search endpoint
use super::{log_failure, validate_identifier};
use crate::{context::AppContext, error::LookupResult, lookup::SearchEntry};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

/// Search accounts and groups
///
/// `a:<term>` covers every account type plus organizational groups, `g:<term>`
/// covers computing groups only, a bare term covers primary accounts plus
/// organizational groups.
pub async fn search(
    State(ctx): State<AppContext>,
    Path(filter): Path<String>,
) -> LookupResult<Json<Vec<SearchEntry>>> {
    let filter = validate_identifier(&filter)?;

    ctx.lookup
        .search(&ctx.request_context(), filter, true)
        .await
        .map(Json)
        .inspect_err(|e| log_failure("search", filter, e))
}

/// Build search routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/v1/search/:filter", get(search))
}
