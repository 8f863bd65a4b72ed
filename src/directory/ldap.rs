/// LDAP connector built on `ldap3`
use super::{DirectoryConnector, DirectoryEntry, DirectorySession, SearchRequest, SearchScope};
use crate::error::{LookupError, LookupResult};
use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::time::Duration;

/// LDAP connection settings
#[derive(Debug, Clone)]
pub struct LdapSettings {
    /// Server URL (e.g., "ldap://localhost:389")
    pub url: String,
    /// Optional simple-bind DN
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    /// Entries requested per page of a paged search
    pub page_size: i32,
    /// Applies to connection setup, bind, and each search
    pub timeout: Duration,
}

impl Default for LdapSettings {
    fn default() -> Self {
        Self {
            url: "ldap://localhost:389".to_string(),
            bind_dn: None,
            bind_password: None,
            page_size: 1000,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Opens a fresh LDAP connection for every logical operation
#[derive(Debug, Clone)]
pub struct LdapConnector {
    settings: LdapSettings,
}

impl LdapConnector {
    pub fn new(settings: LdapSettings) -> Self {
        Self { settings }
    }
}

fn directory_error(action: &str, e: LdapError) -> LookupError {
    LookupError::Directory(format!("{} failed: {}", action, e))
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(&self) -> LookupResult<Box<dyn DirectorySession>> {
        let settings = &self.settings;
        let conn_settings = LdapConnSettings::new().set_conn_timeout(settings.timeout);

        let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, &settings.url)
            .await
            .map_err(|e| directory_error(&format!("Connect to {}", settings.url), e))?;

        tokio::spawn(async move {
            // Connection errors resurface on the next operation
            let _ = conn.drive().await;
        });

        if let Some(bind_dn) = &settings.bind_dn {
            let password = settings.bind_password.as_deref().unwrap_or_default();
            ldap.with_timeout(settings.timeout)
                .simple_bind(bind_dn, password)
                .await
                .and_then(|res| res.success())
                .map_err(|e| directory_error("Bind", e))?;
        }

        Ok(Box::new(LdapSession {
            ldap,
            page_size: settings.page_size,
            timeout: settings.timeout,
        }))
    }
}

struct LdapSession {
    ldap: Ldap,
    page_size: i32,
    timeout: Duration,
}

impl LdapSession {
    async fn paged_search(&mut self, request: &SearchRequest) -> LookupResult<Vec<DirectoryEntry>> {
        let scope = match request.scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        };

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.page_size)),
        ];

        let mut stream = self
            .ldap
            .streaming_search_with(
                adapters,
                &request.base,
                scope,
                &request.filter,
                request.attributes.clone(),
            )
            .await
            .map_err(|e| directory_error("Search", e))?;

        let mut entries = Vec::new();
        while let Some(raw) = stream
            .next()
            .await
            .map_err(|e| directory_error("Search page", e))?
        {
            entries.push(convert_entry(SearchEntry::construct(raw)));
        }

        stream
            .finish()
            .await
            .success()
            .map_err(|e| directory_error("Search", e))?;

        Ok(entries)
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn search(&mut self, request: &SearchRequest) -> LookupResult<Vec<DirectoryEntry>> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.paged_search(request)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(format!(
                "directory search under {} exceeded {:?}",
                request.base, timeout
            ))),
        }
    }

    async fn close(&mut self) {
        let _ = self.ldap.unbind().await;
    }
}

/// Merge text and binary attributes into one raw-valued entry
fn convert_entry(entry: SearchEntry) -> DirectoryEntry {
    let mut out = DirectoryEntry::new(entry.dn);
    for (name, values) in entry.attrs {
        for value in values {
            out.push_value(&name, value.into_bytes());
        }
    }
    for (name, values) in entry.bin_attrs {
        for value in values {
            out.push_value(&name, value);
        }
    }
    out
}
