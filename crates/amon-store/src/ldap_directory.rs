use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, Scope, SearchEntry};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::directory::{DirectoryAdapter, Entry, SearchScope};
use crate::error::StoreError;

/// LDAP-backed [`DirectoryAdapter`]. Bound with administrative credentials
/// at construction (§5 "Directory client: shared; bound with
/// administrative credentials at process start").
pub struct LdapDirectory {
    ldap: Mutex<Ldap>,
}

impl LdapDirectory {
    pub async fn connect(url: &str, bind_dn: &str, bind_password: &str) -> Result<Self, StoreError> {
        let (conn, mut ldap) = LdapConnAsync::new(url)
            .await
            .map_err(|e| StoreError::Directory(format!("connect {url}: {e}")))?;
        ldap3::drive!(conn);
        ldap.simple_bind(bind_dn, bind_password)
            .await
            .and_then(|r| r.success())
            .map_err(|e| StoreError::Directory(format!("bind {bind_dn}: {e}")))?;
        debug!(%bind_dn, "bound to directory");
        Ok(Self { ldap: Mutex::new(ldap) })
    }
}

fn to_ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

#[async_trait]
impl DirectoryAdapter for LdapDirectory {
    async fn get(&self, dn: &str) -> Result<Option<Entry>, StoreError> {
        let mut ldap = self.ldap.lock().await;
        let (entries, _res) = ldap
            .search(dn, Scope::Base, "(objectclass=*)", vec!["*"])
            .await
            .map_err(|e| StoreError::Directory(e.to_string()))?
            .success()
            .map_err(|e| StoreError::Directory(e.to_string()))?;
        Ok(entries.into_iter().next().map(|e| SearchEntry::construct(e).attrs))
    }

    async fn search(&self, base_dn: &str, filter: &str, scope: SearchScope) -> Result<Vec<Entry>, StoreError> {
        let mut ldap = self.ldap.lock().await;
        let (raw_entries, res) = ldap
            .search(base_dn, to_ldap_scope(scope), filter, vec!["*"])
            .await
            .map_err(|e| StoreError::Directory(e.to_string()))?
            .success()
            .map_err(|e| StoreError::Directory(format!("search {base_dn}: {e}")))?;

        if res.rc != 0 {
            return Err(StoreError::Directory(format!("search {base_dn} terminal status {}", res.rc)));
        }
        Ok(raw_entries.into_iter().map(|e| SearchEntry::construct(e).attrs).collect())
    }

    async fn put(&self, dn: &str, entry: Entry) -> Result<(), StoreError> {
        let mut ldap = self.ldap.lock().await;
        // Replace semantics: clear any existing entry then add the new one,
        // avoiding a full LDAP modify-op list for the common "whole entity
        // write" case the master performs.
        let _ = ldap.delete(dn).await;
        let attrs: Vec<(&str, HashSet<&str>)> = entry
            .iter()
            .map(|(k, vs)| (k.as_str(), vs.iter().map(String::as_str).collect::<HashSet<_>>()))
            .collect();
        ldap.add(dn, attrs)
            .await
            .and_then(|r| r.success())
            .map(|_| ())
            .map_err(|e| StoreError::Directory(format!("add {dn}: {e}")))
    }

    async fn del(&self, dn: &str) -> Result<(), StoreError> {
        let mut ldap = self.ldap.lock().await;
        match ldap.delete(dn).await.and_then(|r| r.success()) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(%dn, error = %e, "directory delete failed");
                Err(StoreError::Directory(format!("delete {dn}: {e}")))
            }
        }
    }
}
