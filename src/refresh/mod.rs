/// Bulk refresh of cached membership sets
///
/// Resolves a batch of identifiers with caching disabled, which rewrites each
/// cache entry from the directory. At most `max_concurrency` resolutions run
/// at once; a failure is logged and never affects its siblings.
use crate::lookup::{GroupLookup, LookupContext, Relation};
use crate::metrics;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Outcome counts of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Empty identifiers
    pub skipped: usize,
    /// Identifiers never started because the batch was cancelled
    pub cancelled: usize,
}

/// Bounded worker pool over a `GroupLookup`
#[derive(Clone)]
pub struct BulkRefresher {
    lookup: Arc<dyn GroupLookup>,
    max_concurrency: usize,
}

impl BulkRefresher {
    pub fn new(lookup: Arc<dyn GroupLookup>, max_concurrency: usize) -> Self {
        Self {
            lookup,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Start a batch in the background and return immediately
    ///
    /// The batch runs under its own background context, so it outlives the
    /// request that triggered it.
    pub fn spawn(&self, relation: Relation, ids: Vec<String>) -> JoinHandle<RefreshSummary> {
        let refresher = self.clone();
        tokio::spawn(async move {
            refresher
                .run(&LookupContext::background(), relation, ids)
                .await
        })
    }

    /// Refresh every identifier and wait for all of them to finish
    ///
    /// Cancelling `ctx` stops identifiers that have not yet acquired a slot;
    /// tasks already running observe the same context.
    pub async fn run(
        &self,
        ctx: &LookupContext,
        relation: Relation,
        ids: Vec<String>,
    ) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        let total = ids.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        info!(
            "Bulk refresh of {} {} entries (concurrency {})",
            total, relation, self.max_concurrency
        );

        let mut pending = ids.into_iter();
        while let Some(id) = pending.next() {
            if id.trim().is_empty() {
                summary.skipped += 1;
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = ctx.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                summary.cancelled += 1 + pending.len();
                warn!(
                    "Bulk refresh of {} cancelled, {} entries not started",
                    relation, summary.cancelled
                );
                break;
            };

            let lookup = self.lookup.clone();
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let _permit = permit;
                metrics::REFRESH_TASKS_ACTIVE.inc();
                let result = lookup.members(&ctx, relation, &id, false).await;
                metrics::REFRESH_TASKS_ACTIVE.dec();
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(members))) => {
                    debug!("Refreshed {} {} ({} members)", relation, id, members.len());
                    metrics::record_refresh_task(relation.as_str(), true);
                    summary.refreshed += 1;
                }
                Ok((id, Err(e))) if e.is_not_found() => {
                    warn!("Refresh of {} {} found nothing", relation, id);
                    metrics::record_refresh_task(relation.as_str(), false);
                    summary.not_found += 1;
                }
                Ok((id, Err(e))) => {
                    error!("Refresh of {} {} failed: {}", relation, id, e);
                    metrics::record_refresh_task(relation.as_str(), false);
                    summary.failed += 1;
                }
                Err(e) => {
                    error!("Refresh task for {} panicked: {}", relation, e);
                    metrics::record_refresh_task(relation.as_str(), false);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Bulk refresh of {} done: {} refreshed, {} not found, {} failed",
            relation, summary.refreshed, summary.not_found, summary.failed
        );
        summary
    }
}
