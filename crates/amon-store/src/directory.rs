use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;

/// A directory entry: attribute name → values. Mirrors the multi-valued
/// attribute model of an LDAP entry.
pub type Entry = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

/// §4.1: `get`, `search`, `put`, `del`, addressed by distinguished name.
/// `search` must collect the async entry stream into a complete list; a
/// non-zero terminal status from the backend is surfaced as an error
/// rather than a partial result.
#[async_trait]
pub trait DirectoryAdapter: Send + Sync + 'static {
    async fn get(&self, dn: &str) -> Result<Option<Entry>, StoreError>;
    async fn search(&self, base_dn: &str, filter: &str, scope: SearchScope) -> Result<Vec<Entry>, StoreError>;
    async fn put(&self, dn: &str, entry: Entry) -> Result<(), StoreError>;
    async fn del(&self, dn: &str) -> Result<(), StoreError>;
}
