use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::directory::{DirectoryAdapter, Entry, SearchScope};
use crate::error::StoreError;
use crate::filter::matches_filter;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
}

/// In-memory [`DirectoryAdapter`]. All data is lost on process exit;
/// suitable for tests and local/dev bootstrapping.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryAdapter for InMemoryDirectory {
    async fn get(&self, dn: &str) -> Result<Option<Entry>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.entries.get(dn).cloned())
    }

    async fn search(&self, base_dn: &str, filter: &str, scope: SearchScope) -> Result<Vec<Entry>, StoreError> {
        let guard = self.inner.read().await;
        let matches: Vec<Entry> = guard
            .entries
            .iter()
            .filter(|(dn, _)| dn_in_scope(dn, base_dn, scope))
            .filter(|(_, entry)| matches_filter(filter, entry))
            .map(|(_, entry)| entry.clone())
            .collect();
        Ok(matches)
    }

    async fn put(&self, dn: &str, entry: Entry) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.entries.insert(dn.to_string(), entry);
        Ok(())
    }

    async fn del(&self, dn: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.entries.remove(dn);
        Ok(())
    }
}

fn dn_in_scope(dn: &str, base_dn: &str, scope: SearchScope) -> bool {
    match scope {
        SearchScope::Base => dn == base_dn,
        SearchScope::OneLevel => dn != base_dn && dn.ends_with(base_dn) && !dn.trim_end_matches(base_dn).trim_end_matches(',').contains(','),
        SearchScope::Subtree => dn == base_dn || dn.ends_with(&format!(",{base_dn}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str) -> Entry {
        let mut e = Entry::new();
        e.insert("objectclass".to_string(), vec![kind.to_string()]);
        e
    }

    #[tokio::test]
    async fn put_then_get() {
        let dir = InMemoryDirectory::new();
        dir.put("amonprobe=1,uuid=2,ou=users,o=smartdc", entry("amonprobe")).await.unwrap();
        let got = dir.get("amonprobe=1,uuid=2,ou=users,o=smartdc").await.unwrap();
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn search_subtree_by_filter() {
        let dir = InMemoryDirectory::new();
        dir.put("amonprobe=1,uuid=2,ou=users,o=smartdc", entry("amonprobe")).await.unwrap();
        dir.put("amonprobegroup=3,uuid=2,ou=users,o=smartdc", entry("amonprobegroup")).await.unwrap();

        let probes = dir
            .search("uuid=2,ou=users,o=smartdc", "(objectclass=amonprobe)", SearchScope::Subtree)
            .await
            .unwrap();
        assert_eq!(probes.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let dir = InMemoryDirectory::new();
        dir.put("uuid=2,ou=users,o=smartdc", entry("sdcperson")).await.unwrap();
        dir.del("uuid=2,ou=users,o=smartdc").await.unwrap();
        assert!(dir.get("uuid=2,ou=users,o=smartdc").await.unwrap().is_none());
    }
}
