/// Directory Resolver - answers membership questions straight from the directory
use super::schema::{
    DirectorySchema, ATTR_ACCOUNT_NAME, ATTR_CN, ATTR_DISPLAY_NAME, ATTR_MAIL, ATTR_MEMBER_OF,
    ATTR_TOKEN_GROUPS,
};
use super::sid::decode_sid;
use super::{DirectoryConnector, DirectoryEntry, DirectorySession, SearchRequest, SearchScope};
use crate::error::{LookupError, LookupResult};
use crate::lookup::{AccountType, GroupLookup, LookupContext, Relation, SearchEntry};
use crate::metrics;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which sub-searches a free-text search runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchScopeSet {
    accounts: bool,
    primary_only: bool,
    groups: bool,
    computing_groups: bool,
}

/// Split an optional `a:` / `g:` prefix off a search filter
fn parse_search_filter(filter: &str) -> (SearchScopeSet, &str) {
    if let Some(term) = filter.strip_prefix("a:") {
        let scopes = SearchScopeSet {
            accounts: true,
            primary_only: false,
            groups: true,
            computing_groups: false,
        };
        (scopes, term)
    } else if let Some(term) = filter.strip_prefix("g:") {
        let scopes = SearchScopeSet {
            accounts: false,
            primary_only: false,
            groups: false,
            computing_groups: true,
        };
        (scopes, term)
    } else {
        let scopes = SearchScopeSet {
            accounts: true,
            primary_only: true,
            groups: true,
            computing_groups: false,
        };
        (scopes, filter)
    }
}

/// Resolves lookups by querying the directory, one connection per call
///
/// Has no cache of its own: `use_cache` is ignored and `remaining_ttl`
/// always reports `None`.
#[derive(Clone)]
pub struct DirectoryResolver {
    connector: Arc<dyn DirectoryConnector>,
    schema: DirectorySchema,
}

impl DirectoryResolver {
    pub fn new(connector: Arc<dyn DirectoryConnector>, schema: DirectorySchema) -> Self {
        Self { connector, schema }
    }

    #[cfg(test)]
    pub fn schema(&self) -> &DirectorySchema {
        &self.schema
    }

    /// Open a connection, run `op` on it, and always close it afterwards
    async fn with_session<T, F>(&self, ctx: &LookupContext, operation: &str, op: F) -> LookupResult<T>
    where
        F: for<'s> FnOnce(&'s mut dyn DirectorySession) -> BoxFuture<'s, LookupResult<T>> + Send,
        T: Send,
    {
        let started = Instant::now();
        let result = ctx
            .run(operation, async {
                let mut session = self.connector.connect().await?;
                let result = op(session.as_mut()).await;
                session.close().await;
                result
            })
            .await;

        metrics::record_directory_query(operation, started.elapsed(), result.is_ok());
        result
    }

    /// Users of the group at `group_dn`, including nested membership
    async fn transitive_members(
        &self,
        ctx: &LookupContext,
        operation: &str,
        gid: &str,
        group_dn: String,
    ) -> LookupResult<Vec<String>> {
        let request = SearchRequest::new(
            self.schema.users_base.clone(),
            SearchScope::Subtree,
            DirectorySchema::transitive_members_filter(&group_dn),
        )
        .with_attributes(&["dn", ATTR_ACCOUNT_NAME, ATTR_MEMBER_OF]);

        let entries = self
            .with_session(ctx, operation, |session| {
                Box::pin(async move { session.search(&request).await })
            })
            .await?;

        let uids = entries
            .iter()
            .filter_map(|entry| entry.first_text(ATTR_ACCOUNT_NAME))
            .filter(|uid| !uid.is_empty())
            .map(str::to_string);

        non_empty(gid, uids)
    }

    fn search_entry(&self, entry: &DirectoryEntry, account_type: AccountType) -> SearchEntry {
        let text = |name: &str| entry.first_text(name).unwrap_or_default().to_string();
        SearchEntry {
            dn: entry.dn.clone(),
            cn: text(ATTR_CN),
            display_name: text(ATTR_DISPLAY_NAME),
            mail: text(ATTR_MAIL),
            account_type,
        }
    }
}

/// The single place where "no members" becomes "does not exist"
///
/// Duplicates are dropped, first occurrence wins, so the order stays
/// deterministic for a given directory answer.
fn non_empty(id: &str, members: impl Iterator<Item = String>) -> LookupResult<Vec<String>> {
    let mut seen = HashSet::new();
    let members: Vec<String> = members.filter(|m| seen.insert(m.clone())).collect();
    if members.is_empty() {
        return Err(LookupError::NotFound(id.to_string()));
    }
    Ok(members)
}

#[async_trait]
impl GroupLookup for DirectoryResolver {
    /// Expensive on large groups: a subtree search with a transitive
    /// membership match. Prefer the cached path.
    async fn users_in_group(
        &self,
        ctx: &LookupContext,
        gid: &str,
        _use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.transitive_members(ctx, "users_in_group", gid, self.schema.group_dn(gid))
            .await
    }

    async fn users_in_computing_group(
        &self,
        ctx: &LookupContext,
        gid: &str,
        _use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.transitive_members(
            ctx,
            "users_in_computing_group",
            gid,
            self.schema.computing_group_dn(gid),
        )
        .await
    }

    /// Transitive groups of a user
    ///
    /// The directory only exposes transitive membership as the binary
    /// `tokenGroups` SIDs on the user, so they are decoded and resolved back
    /// to group names with a second query on the same connection.
    async fn user_groups(
        &self,
        ctx: &LookupContext,
        uid: &str,
        _use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        let token_request = SearchRequest::new(
            self.schema.user_dn(uid),
            SearchScope::Base,
            "(objectClass=User)",
        )
        .with_attributes(&[ATTR_TOKEN_GROUPS]);
        let groups_base = self.schema.groups_base.clone();

        let entries = self
            .with_session(ctx, "user_groups", |session| {
                Box::pin(async move {
                    let users = session.search(&token_request).await?;

                    let mut sids = Vec::new();
                    for entry in &users {
                        for raw in entry.binary_values(ATTR_TOKEN_GROUPS) {
                            sids.push(decode_sid(raw)?);
                        }
                    }
                    if sids.is_empty() {
                        return Ok(Vec::new());
                    }

                    let groups_request = SearchRequest::new(
                        groups_base,
                        SearchScope::OneLevel,
                        DirectorySchema::groups_by_sid_filter(&sids),
                    )
                    .with_attributes(&[ATTR_CN]);
                    session.search(&groups_request).await
                })
            })
            .await?;

        let gids = entries
            .iter()
            .flat_map(|entry| entry.text_values(ATTR_CN))
            .map(str::to_string);

        non_empty(uid, gids)
    }

    /// Direct computing groups of a user, read from `memberOf`
    async fn user_computing_groups(
        &self,
        ctx: &LookupContext,
        uid: &str,
        _use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        let request = SearchRequest::new(
            self.schema.users_base.clone(),
            SearchScope::OneLevel,
            DirectorySchema::user_by_cn_filter(uid),
        )
        .with_attributes(&["dn", ATTR_MEMBER_OF]);

        let entries = self
            .with_session(ctx, "user_computing_groups", |session| {
                Box::pin(async move { session.search(&request).await })
            })
            .await?;

        let gids = entries
            .iter()
            .flat_map(|entry| entry.text_values(ATTR_MEMBER_OF))
            .filter_map(|link| self.schema.computing_group_name(link))
            .map(str::to_string);

        non_empty(uid, gids)
    }

    async fn remaining_ttl(
        &self,
        _ctx: &LookupContext,
        _relation: Relation,
        _key: &str,
    ) -> LookupResult<Option<Duration>> {
        Ok(None)
    }

    /// Accounts first, then organizational groups, then computing groups
    async fn search(
        &self,
        ctx: &LookupContext,
        filter: &str,
        _use_cache: bool,
    ) -> LookupResult<Vec<SearchEntry>> {
        let (scopes, term) = parse_search_filter(filter);
        if term.trim().is_empty() {
            return Err(LookupError::Validation(format!(
                "Search filter has no term: {}",
                filter
            )));
        }
        let account_type_attribute = self.schema.account_type_attribute.clone();

        let mut requests = Vec::new();
        if scopes.accounts {
            requests.push((
                None,
                SearchRequest::new(
                    self.schema.users_base.clone(),
                    SearchScope::OneLevel,
                    self.schema.account_search_filter(term, scopes.primary_only),
                )
                .with_attributes(&[
                    "dn",
                    ATTR_CN,
                    ATTR_DISPLAY_NAME,
                    ATTR_MAIL,
                    account_type_attribute.as_str(),
                ]),
            ));
        }
        if scopes.groups {
            requests.push((
                Some(AccountType::EGroup),
                SearchRequest::new(
                    self.schema.groups_base.clone(),
                    SearchScope::OneLevel,
                    DirectorySchema::group_search_filter(term),
                )
                .with_attributes(&["dn", ATTR_CN, ATTR_DISPLAY_NAME, ATTR_MAIL]),
            ));
        }
        if scopes.computing_groups {
            requests.push((
                Some(AccountType::UnixGroup),
                SearchRequest::new(
                    self.schema.computing_groups_base.clone(),
                    SearchScope::OneLevel,
                    DirectorySchema::group_search_filter(term),
                )
                .with_attributes(&["dn", ATTR_CN, ATTR_DISPLAY_NAME, ATTR_MAIL]),
            ));
        }

        let batches = self
            .with_session(ctx, "search", |session| {
                Box::pin(async move {
                    let mut batches = Vec::with_capacity(requests.len());
                    for (account_type, request) in requests {
                        let entries = session.search(&request).await?;
                        batches.push((account_type, entries));
                    }
                    Ok::<_, LookupError>(batches)
                })
            })
            .await?;

        let mut results = Vec::new();
        for (account_type, entries) in batches {
            for entry in &entries {
                let account_type = account_type.unwrap_or_else(|| {
                    AccountType::from_directory_value(
                        entry
                            .first_text(&account_type_attribute)
                            .unwrap_or_default(),
                    )
                });
                results.push(self.search_entry(entry, account_type));
            }
        }
        Ok(results)
    }
}
