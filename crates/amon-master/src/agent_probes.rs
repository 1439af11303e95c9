//! §4.9 Agent-Probes Endpoint: serve and cache the per-machine probe
//! manifest and its content digest.
//!
//! Digest is a SHA-256 over the canonical (sorted-key) JSON of the
//! agent's probe list, grounded on the teacher's
//! `nclav-store::state::compute_desired_hash` ("sort JSON object keys
//! before hashing so HashMap field order never perturbs the digest").

use std::sync::Arc;

use amon_cache::CacheRegistry;
use amon_domain::{AgentId, Probe};
use amon_store::{dn, DirectoryAdapter, SearchScope};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::MasterError;

pub struct AgentProbesService {
    directory: Arc<dyn DirectoryAdapter>,
    cache: Arc<CacheRegistry>,
}

impl AgentProbesService {
    pub fn new(directory: Arc<dyn DirectoryAdapter>, cache: Arc<CacheRegistry>) -> Self {
        Self { directory, cache }
    }

    /// The full manifest (internal serialization, private fields
    /// included per §4.9) and its digest. Served from the dedicated
    /// `AgentProbes` cache, invalidated on any probe write/delete
    /// touching this agent (§4.3, §4.9).
    pub async fn manifest(&self, agent: AgentId) -> Result<(String, Value), MasterError> {
        let key = agent.to_string();
        if let Some(hit) = self.cache.agent_probes.get(&key).and_then(|e| e.into_hit()) {
            return Ok(hit);
        }

        let entries = self
            .directory
            .search("ou=users,o=smartdc", "(objectclass=amonprobe)", SearchScope::Subtree)
            .await?;
        let probes: Vec<Probe> = entries
            .iter()
            .filter_map(entry_to_probe)
            .filter(|p| p.agent == agent)
            .collect();
        let manifest: Value = serde_json::Value::Array(probes.iter().map(Probe::to_internal_json).collect());
        let digest = compute_digest(&manifest);

        self.cache.agent_probes.set_hit(key, (digest.clone(), manifest.clone()));
        Ok((digest, manifest))
    }

    /// `HEAD /agentprobes`: digest only, without materializing the full
    /// manifest response body (§4.9).
    pub async fn digest(&self, agent: AgentId) -> Result<String, MasterError> {
        Ok(self.manifest(agent).await?.0)
    }
}

fn entry_to_probe(entry: &amon_store::Entry) -> Option<Probe> {
    let raw = entry.get("probe")?.first()?;
    serde_json::from_str(raw).ok()
}

/// SHA-256 over the canonical JSON of `value`, keys sorted recursively so
/// two semantically-identical manifests always hash identically
/// regardless of `HashMap` iteration order (§8 scenario 6: "digest
/// stability").
fn compute_digest(value: &Value) -> String {
    let canonical = sort_json_keys(value.clone());
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

fn sort_json_keys(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_json_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amon_cache::RegistrySettings;
    use amon_domain::{MachineId, ProbeId, UserId};
    use amon_store::InMemoryDirectory;
    use uuid::Uuid;

    fn cache() -> Arc<CacheRegistry> {
        let cs = amon_cache::CacheSettings { capacity: 0, ttl_secs: 30 };
        Arc::new(CacheRegistry::new(RegistrySettings {
            disabled: false,
            probe_list: cs,
            probe_get: cs,
            probe_group_list: cs,
            probe_group_get: cs,
            agent_probes: cs,
            user_resolve: cs,
        }))
    }

    async fn put_probe(dir: &InMemoryDirectory, probe: &Probe) {
        let mut e = amon_store::Entry::new();
        e.insert("objectclass".to_string(), vec!["amonprobe".to_string()]);
        e.insert("probe".to_string(), vec![serde_json::to_string(probe).unwrap()]);
        let d = dn::probe_dn(&probe.uuid.to_string(), &probe.user.to_string());
        dir.put(&d, e).await.unwrap();
    }

    fn probe(agent: AgentId) -> Probe {
        Probe {
            uuid: ProbeId(Uuid::new_v4()),
            user: UserId(Uuid::new_v4()),
            name: Some("disk".into()),
            kind: "log-scan".into(),
            agent,
            machine: MachineId(agent.as_uuid()),
            group: None,
            contacts: vec![],
            config: None,
            disabled: false,
            run_in_vm_host: false,
        }
    }

    #[tokio::test]
    async fn digest_is_stable_across_repeated_calls() {
        let dir = Arc::new(InMemoryDirectory::new());
        let agent = AgentId(Uuid::new_v4());
        put_probe(&dir, &probe(agent)).await;

        let svc = AgentProbesService::new(dir, cache());
        let d1 = svc.digest(agent).await.unwrap();
        let d2 = svc.digest(agent).await.unwrap();
        assert_eq!(d1, d2);
    }

    #[tokio::test]
    async fn digest_changes_after_a_write_to_that_agent() {
        let dir = Arc::new(InMemoryDirectory::new());
        let cache = cache();
        let agent = AgentId(Uuid::new_v4());
        let p = probe(agent);
        put_probe(&dir, &p).await;

        let svc = AgentProbesService::new(dir.clone(), cache.clone());
        let before = svc.digest(agent).await.unwrap();

        let mut p2 = p.clone();
        p2.name = Some("disk-renamed".into());
        put_probe(&dir, &p2).await;
        cache.agent_probes.invalidate(&agent.to_string());

        let after = svc.digest(agent).await.unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn manifest_only_includes_probes_for_the_requested_agent() {
        let dir = Arc::new(InMemoryDirectory::new());
        let agent_a = AgentId(Uuid::new_v4());
        let agent_b = AgentId(Uuid::new_v4());
        put_probe(&dir, &probe(agent_a)).await;
        put_probe(&dir, &probe(agent_b)).await;

        let svc = AgentProbesService::new(dir, cache());
        let (_, manifest) = svc.manifest(agent_a).await.unwrap();
        assert_eq!(manifest.as_array().unwrap().len(), 1);
    }
}
