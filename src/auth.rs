/// Shared-secret authentication for API routes
use crate::{context::AppContext, error::LookupError};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compare a presented token with the configured secret, ignoring ASCII case
pub fn secret_matches(token: &str, secret: &str) -> bool {
    !secret.is_empty() && token.eq_ignore_ascii_case(secret)
}

/// Reject requests that do not carry the shared secret
pub async fn require_shared_secret(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, LookupError> {
    let token = extract_bearer_token(req.headers())
        .ok_or_else(|| LookupError::Authentication("Missing authorization header".to_string()))?;

    if !secret_matches(token, &ctx.config.authentication.shared_secret) {
        return Err(LookupError::Authentication("Invalid shared secret".to_string()));
    }

    Ok(next.run(req).await)
}
