/// Scripted directory connector recording every search it receives
use super::{DirectoryConnector, DirectoryEntry, DirectorySession, SearchRequest};
use crate::error::{LookupError, LookupResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    responses: HashMap<(String, String), LookupResult<Vec<DirectoryEntry>>>,
    requests: Vec<SearchRequest>,
}

/// Searches not scripted return no entries
#[derive(Clone, Default)]
pub struct FakeDirectory {
    script: Arc<Mutex<Script>>,
    connect_error: Arc<Mutex<Option<LookupError>>>,
    connections: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, base: &str, filter: &str, entries: Vec<DirectoryEntry>) {
        self.script
            .lock()
            .unwrap()
            .responses
            .insert((base.to_string(), filter.to_string()), Ok(entries));
    }

    pub fn fail_search(&self, base: &str, filter: &str, err: LookupError) {
        self.script
            .lock()
            .unwrap()
            .responses
            .insert((base.to_string(), filter.to_string()), Err(err));
    }

    pub fn fail_connect(&self, err: LookupError) {
        *self.connect_error.lock().unwrap() = Some(err);
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryConnector for FakeDirectory {
    async fn connect(&self) -> LookupResult<Box<dyn DirectorySession>> {
        if let Some(err) = self.connect_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            directory: self.clone(),
        }))
    }
}

struct FakeSession {
    directory: FakeDirectory,
}

#[async_trait]
impl DirectorySession for FakeSession {
    async fn search(&mut self, request: &SearchRequest) -> LookupResult<Vec<DirectoryEntry>> {
        let mut script = self.directory.script.lock().unwrap();
        script.requests.push(request.clone());
        script
            .responses
            .get(&(request.base.clone(), request.filter.clone()))
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn close(&mut self) {
        self.directory.closes.fetch_add(1, Ordering::SeqCst);
    }
}
