/// Lookup capability shared by the directory resolver and the cache decorator
///
/// Callers hold an `Arc<dyn GroupLookup>` and never know whether it is the bare
/// resolver or a cache wrapping it.

pub mod context;

#[cfg(test)]
pub mod testing;

pub use context::LookupContext;

use crate::error::LookupResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The four membership relations, one cache namespace each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Organizational group → users
    GroupUsers,
    /// Computing group → users
    ComputingGroupUsers,
    /// User → organizational groups
    UserGroups,
    /// User → computing groups
    UserComputingGroups,
}

impl Relation {
    #[cfg(test)]
    pub const ALL: [Relation; 4] = [
        Relation::GroupUsers,
        Relation::ComputingGroupUsers,
        Relation::UserGroups,
        Relation::UserComputingGroups,
    ];

    /// Cache key prefix for this relation
    pub fn key_prefix(self) -> &'static str {
        match self {
            Relation::GroupUsers => "egroup:",
            Relation::ComputingGroupUsers => "unixgroup:",
            Relation::UserGroups => "u:",
            Relation::UserComputingGroups => "unixuser:",
        }
    }

    /// Short name used in metrics labels and logs
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::GroupUsers => "group_users",
            Relation::ComputingGroupUsers => "computing_group_users",
            Relation::UserGroups => "user_groups",
            Relation::UserComputingGroups => "user_computing_groups",
        }
    }

    /// Whether the relation is keyed by a group (true) or a user (false)
    pub fn keyed_by_group(self) -> bool {
        matches!(self, Relation::GroupUsers | Relation::ComputingGroupUsers)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of directory object a search result represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Primary,
    Secondary,
    Service,
    #[serde(rename = "egroup")]
    EGroup,
    #[serde(rename = "unixgroup")]
    UnixGroup,
    Undefined,
}

impl AccountType {
    /// Map the directory's account-type attribute value
    pub fn from_directory_value(value: &str) -> Self {
        match value {
            "Primary" => AccountType::Primary,
            "Secondary" => AccountType::Secondary,
            "Service" => AccountType::Service,
            _ => AccountType::Undefined,
        }
    }
}

/// Free-text search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub dn: String,
    pub cn: String,
    pub display_name: String,
    pub mail: String,
    pub account_type: AccountType,
}

/// Membership lookups against some backing source
///
/// Enumeration operations return a deterministic, de-duplicated list, or
/// [`LookupError::NotFound`](crate::error::LookupError::NotFound) when the
/// resolved set is empty. Any other error is an infrastructure failure.
/// `use_cache` is a hint that implementations without a cache ignore.
#[async_trait]
pub trait GroupLookup: Send + Sync + 'static {
    async fn users_in_group(
        &self,
        ctx: &LookupContext,
        gid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>>;

    async fn users_in_computing_group(
        &self,
        ctx: &LookupContext,
        gid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>>;

    async fn user_groups(
        &self,
        ctx: &LookupContext,
        uid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>>;

    async fn user_computing_groups(
        &self,
        ctx: &LookupContext,
        uid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>>;

    /// Remaining lifetime of the cached entry, `None` when not cached
    async fn remaining_ttl(
        &self,
        ctx: &LookupContext,
        relation: Relation,
        key: &str,
    ) -> LookupResult<Option<Duration>>;

    /// Substring search; `a:` and `g:` prefixes widen or narrow the scope
    async fn search(
        &self,
        ctx: &LookupContext,
        filter: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<SearchEntry>>;

    /// Dispatch to the enumeration operation for `relation`
    async fn members(
        &self,
        ctx: &LookupContext,
        relation: Relation,
        id: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        match relation {
            Relation::GroupUsers => self.users_in_group(ctx, id, use_cache).await,
            Relation::ComputingGroupUsers => {
                self.users_in_computing_group(ctx, id, use_cache).await
            }
            Relation::UserGroups => self.user_groups(ctx, id, use_cache).await,
            Relation::UserComputingGroups => {
                self.user_computing_groups(ctx, id, use_cache).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = Relation::ALL.iter().map(|r| r.key_prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), 4);
    }

    #[test]
    fn test_account_type_mapping() {
        assert_eq!(AccountType::from_directory_value("Primary"), AccountType::Primary);
        assert_eq!(AccountType::from_directory_value("Secondary"), AccountType::Secondary);
        assert_eq!(AccountType::from_directory_value("Service"), AccountType::Service);
        assert_eq!(AccountType::from_directory_value("primary"), AccountType::Undefined);
        assert_eq!(AccountType::from_directory_value(""), AccountType::Undefined);
    }

    #[test]
    fn test_search_entry_serialization() {
        let entry = SearchEntry {
            dn: "CN=smith,OU=e-groups,OU=Workgroups,DC=example,DC=com".to_string(),
            cn: "smith".to_string(),
            display_name: "Smith group".to_string(),
            mail: "smith@example.com".to_string(),
            account_type: AccountType::EGroup,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["displayName"], "Smith group");
        assert_eq!(json["accountType"], "egroup");
    }
}
