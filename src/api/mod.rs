/// API routes and handlers
pub mod membership;
pub mod refresh;
pub mod search;

use crate::context::AppContext;
use crate::error::{LookupError, LookupResult};
use axum::Router;
use tracing::{debug, error};

/// Build API routes; computing-group routes only when `computing_groups` is set
pub fn routes(computing_groups: bool) -> Router<AppContext> {
    Router::new()
        .merge(membership::routes(computing_groups))
        .merge(search::routes())
        .merge(refresh::routes(computing_groups))
}

/// Check a path identifier before it reaches the directory
///
/// ASCII letters, digits, whitespace and `_ . - :` only.
pub fn validate_identifier(id: &str) -> LookupResult<&str> {
    if id.is_empty() {
        return Err(LookupError::Validation(
            "Identifier cannot be empty".to_string(),
        ));
    }

    let valid = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || matches!(c, '_' | '.' | '-' | ':'));
    if !valid {
        return Err(LookupError::Validation(format!(
            "Identifier contains invalid characters: {}",
            id
        )));
    }

    Ok(id)
}

/// Log a failed lookup at a level matching its kind
fn log_failure(operation: &str, id: &str, err: &LookupError) {
    if err.is_not_found() {
        debug!("{} {}: not found", operation, id);
    } else {
        error!("{} {} failed: {}", operation, id, err);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for id in ["it-dep", "alice", "a.b_c", "ns:group", "with space"] {
            assert_eq!(validate_identifier(id).unwrap(), id);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for id in ["", "a*", "cn=x)", "g/1", "dé", "no\u{a0}break"] {
            assert!(matches!(
                validate_identifier(id),
                Err(LookupError::Validation(_))
            ));
        }
    }
}
