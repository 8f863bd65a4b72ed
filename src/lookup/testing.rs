/// Scripted `GroupLookup` for exercising decorators and the refresher
use super::{GroupLookup, LookupContext, Relation, SearchEntry};
use crate::error::{LookupError, LookupResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Answers from a table keyed by (relation, id); unknown ids resolve to
/// NotFound, the same way an empty directory result does.
#[derive(Default)]
pub struct FakeLookup {
    answers: Mutex<HashMap<(Relation, String), LookupResult<Vec<String>>>>,
    calls: Mutex<Vec<(Relation, String, bool)>>,
    searches: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every resolution sleeps for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set(&self, relation: Relation, id: &str, members: &[&str]) {
        self.answers.lock().unwrap().insert(
            (relation, id.to_string()),
            Ok(members.iter().map(|m| m.to_string()).collect()),
        );
    }

    pub fn fail(&self, relation: Relation, id: &str, err: LookupError) {
        self.answers
            .lock()
            .unwrap()
            .insert((relation, id.to_string()), Err(err));
    }

    /// Number of resolutions that reached this lookup
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(Relation, String, bool)> {
        self.calls.lock().unwrap().clone()
    }

    /// Filters that reached `search`
    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(
        &self,
        relation: Relation,
        id: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .push((relation, id.to_string(), use_cache));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let answer = self
            .answers
            .lock()
            .unwrap()
            .get(&(relation, id.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(LookupError::NotFound(id.to_string())));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer
    }
}

#[async_trait]
impl GroupLookup for FakeLookup {
    async fn users_in_group(
        &self,
        _ctx: &LookupContext,
        gid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.answer(Relation::GroupUsers, gid, use_cache).await
    }

    async fn users_in_computing_group(
        &self,
        _ctx: &LookupContext,
        gid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.answer(Relation::ComputingGroupUsers, gid, use_cache)
            .await
    }

    async fn user_groups(
        &self,
        _ctx: &LookupContext,
        uid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.answer(Relation::UserGroups, uid, use_cache).await
    }

    async fn user_computing_groups(
        &self,
        _ctx: &LookupContext,
        uid: &str,
        use_cache: bool,
    ) -> LookupResult<Vec<String>> {
        self.answer(Relation::UserComputingGroups, uid, use_cache)
            .await
    }

    async fn remaining_ttl(
        &self,
        _ctx: &LookupContext,
        _relation: Relation,
        _key: &str,
    ) -> LookupResult<Option<Duration>> {
        Ok(None)
    }

    async fn search(
        &self,
        _ctx: &LookupContext,
        filter: &str,
        _use_cache: bool,
    ) -> LookupResult<Vec<SearchEntry>> {
        self.searches.lock().unwrap().push(filter.to_string());
        Ok(vec![SearchEntry {
            dn: format!("CN={},OU=Users", filter),
            cn: filter.to_string(),
            display_name: filter.to_string(),
            mail: String::new(),
            account_type: super::AccountType::Primary,
        }])
    }
}
