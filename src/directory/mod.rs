/// Directory access: protocol connection, schema knowledge and the resolver
///
/// The resolver only talks to a [`DirectoryConnector`]; the LDAP
/// implementation lives in [`ldap`] and tests substitute a scripted one.

pub mod ldap;
pub mod resolver;
pub mod schema;
pub mod sid;

#[cfg(test)]
pub mod testing;

pub use ldap::{LdapConnector, LdapSettings};
pub use resolver::DirectoryResolver;
pub use schema::DirectorySchema;

use crate::error::LookupResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// Search scope relative to the base DN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

/// One directory search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    pub filter: String,
    pub attributes: Vec<String>,
}

impl SearchRequest {
    pub fn new(base: impl Into<String>, scope: SearchScope, filter: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            scope,
            filter: filter.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }
}

/// A search result entry with raw attribute values
///
/// Attribute names are matched case-insensitively, as the protocol does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn push_value(&mut self, name: &str, value: Vec<u8>) {
        self.attributes
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value);
    }

    #[cfg(test)]
    pub fn with_text(mut self, name: &str, values: &[&str]) -> Self {
        for value in values {
            self.push_value(name, value.as_bytes().to_vec());
        }
        self
    }

    #[cfg(test)]
    pub fn with_binary(mut self, name: &str, values: Vec<Vec<u8>>) -> Self {
        for value in values {
            self.push_value(name, value);
        }
        self
    }

    /// Raw values of `name`, empty when absent
    pub fn binary_values(&self, name: &str) -> &[Vec<u8>] {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Values of `name` that are valid UTF-8
    pub fn text_values(&self, name: &str) -> Vec<&str> {
        self.binary_values(name)
            .iter()
            .filter_map(|v| std::str::from_utf8(v).ok())
            .collect()
    }

    /// First text value of `name`
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.text_values(name).into_iter().next()
    }
}

/// Opens one connection per logical operation
#[async_trait]
pub trait DirectoryConnector: Send + Sync + 'static {
    async fn connect(&self) -> LookupResult<Box<dyn DirectorySession>>;
}

/// An open, bound directory connection
#[async_trait]
pub trait DirectorySession: Send {
    /// Run a search, following result paging until every entry is collected
    async fn search(&mut self, request: &SearchRequest) -> LookupResult<Vec<DirectoryEntry>>;

    /// Unbind and drop the connection
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_names_case_insensitive() {
        let entry = DirectoryEntry::new("CN=alice").with_text("sAMAccountName", &["alice"]);
        assert_eq!(entry.first_text("samaccountname"), Some("alice"));
        assert_eq!(entry.first_text("SAMACCOUNTNAME"), Some("alice"));
        assert_eq!(entry.first_text("mail"), None);
    }

    #[test]
    fn test_text_values_skip_binary() {
        let entry = DirectoryEntry::new("CN=x")
            .with_binary("tokenGroups", vec![vec![0xff, 0xfe], b"plain".to_vec()]);
        assert_eq!(entry.binary_values("tokengroups").len(), 2);
        assert_eq!(entry.text_values("tokengroups"), vec!["plain"]);
    }
}
