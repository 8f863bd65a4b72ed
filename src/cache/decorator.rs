/// Cache-aside decorator over any `GroupLookup`
use super::MembershipStore;
use crate::error::LookupResult;
use crate::lookup::{GroupLookup, LookupContext, Relation, SearchEntry};
use crate::metrics;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Serves enumerations from the store while an entry is live and rewrites
/// the entry from the wrapped lookup otherwise.
///
/// A failed resolution is returned unchanged and leaves the stored entry as
/// it was, so a stale set is never served as fresh. Empty results are never
/// stored: the wrapped lookup reports them as NotFound.
pub struct CachedLookup {
    inner: Arc<dyn GroupLookup>,
    store: Arc<dyn MembershipStore>,
    ttl: Duration,
    key_prefix: String,
}

impl CachedLookup {
    pub fn new(
        inner: Arc<dyn GroupLookup>,
        store: Arc<dyn MembershipStore>,
        ttl: Duration,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            store,
            ttl,
            key_prefix: key_prefix.into(),
        }
    }

    /// Store key for `id` in the namespace of `relation`
    pub fn cache_key(&self, relation: Relation, id: &str) -> String {
        format!("{}{}{}", self.key_prefix, relation.key_prefix(), id)
    }

    async fn cached_members(
        &self,
        ctx: &LookupContext,
        relation: Relation,
        id: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        let key = self.cache_key(relation, id);

        if use_cache {
            let hit = ctx.run("cache read", self.store.members(&key)).await?;
            metrics::record_cache_access(relation.as_str(), hit.is_some());
            if let Some(members) = hit {
                return Ok(members);
            }
        }

        let members = self.inner.members(ctx, relation, id, false).await?;
        ctx.run("cache write", self.store.replace(&key, &members, self.ttl))
            .await?;
        Ok(members)
    }
}

#[async_trait]
impl GroupLookup for CachedLookup {
    async fn users_in_group(
        &self,
        ctx: &LookupContext,
        gid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.cached_members(ctx, Relation::GroupUsers, gid, use_cache)
            .await
    }

    async fn users_in_computing_group(
        &self,
        ctx: &LookupContext,
        gid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.cached_members(ctx, Relation::ComputingGroupUsers, gid, use_cache)
            .await
    }

    async fn user_groups(
        &self,
        ctx: &LookupContext,
        uid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.cached_members(ctx, Relation::UserGroups, uid, use_cache)
            .await
    }

    async fn user_computing_groups(
        &self,
        ctx: &LookupContext,
        uid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.cached_members(ctx, Relation::UserComputingGroups, uid, use_cache)
            .await
    }

    async fn remaining_ttl(
        &self,
        ctx: &LookupContext,
        relation: Relation,
        key: &str,
    ) -> LookupResult<Option<Duration>> {
        let key = self.cache_key(relation, key);
        ctx.run("cache ttl", self.store.ttl(&key)).await
    }

    /// Search results are never cached
    async fn search(
        &self,
        ctx: &LookupContext,
        filter: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<SearchEntry>> {
        self.inner.search(ctx, filter, use_cache).await
    }
}
