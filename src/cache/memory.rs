/// In-memory membership store with real expiry
use super::MembershipStore;
use crate::error::{LookupError, LookupResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

struct Entry {
    members: Vec<String>,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `replace` fail
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Whether `key` exists and has not expired
    pub fn contains(&self, key: &str) -> bool {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .map(|e| e.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn members(&self, key: &str) -> LookupResult<Option<Vec<String>>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.members.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn replace(&self, key: &str, members: &[String], ttl: Duration) -> LookupResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LookupError::Cache("write refused".to_string()));
        }

        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        if !members.is_empty() {
            entries.insert(
                key.to_string(),
                Entry {
                    members: members.to_vec(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> LookupResult<Option<Duration>> {
        let entries = self.entries.lock().unwrap();
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.expires_at - now))
    }
}
