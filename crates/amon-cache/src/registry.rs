use serde_json::Value;

use crate::cache::Cache;

/// Per-named-cache capacity/ttl, independent of how the caller loads config.
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub capacity: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct RegistrySettings {
    pub disabled: bool,
    pub probe_list: CacheSettings,
    pub probe_get: CacheSettings,
    pub probe_group_list: CacheSettings,
    pub probe_group_get: CacheSettings,
    pub agent_probes: CacheSettings,
    pub user_resolve: CacheSettings,
}

/// The entity kinds the invalidation policy (§4.3) distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Probe,
    ProbeGroup,
}

/// The process-wide set of named caches plus the centrally-enforced
/// invalidation policy from §4.3: writing/deleting entity `K` clears
/// `KList` and `KGet[dn]`; writing a probe additionally clears
/// `AgentProbes[agent]`.
pub struct CacheRegistry {
    pub probe_list: Cache<String, Value>,
    pub probe_get: Cache<String, Value>,
    pub probe_group_list: Cache<String, Value>,
    pub probe_group_get: Cache<String, Value>,
    pub agent_probes: Cache<String, (String, Value)>,
    pub user_resolve: Cache<String, Value>,
}

impl CacheRegistry {
    pub fn new(s: RegistrySettings) -> Self {
        Self {
            probe_list: Cache::new(s.probe_list.capacity, s.probe_list.ttl_secs, s.disabled),
            probe_get: Cache::new(s.probe_get.capacity, s.probe_get.ttl_secs, s.disabled),
            probe_group_list: Cache::new(s.probe_group_list.capacity, s.probe_group_list.ttl_secs, s.disabled),
            probe_group_get: Cache::new(s.probe_group_get.capacity, s.probe_group_get.ttl_secs, s.disabled),
            agent_probes: Cache::new(s.agent_probes.capacity, s.agent_probes.ttl_secs, s.disabled),
            user_resolve: Cache::new(s.user_resolve.capacity, s.user_resolve.ttl_secs, s.disabled),
        }
    }

    /// List cache keyed by user id string; get cache keyed by entity dn.
    pub fn invalidate_write(&self, kind: EntityKind, user_key: &str, dn: &str, agent: Option<&str>) {
        match kind {
            EntityKind::Probe => {
                self.probe_list.invalidate(&user_key.to_string());
                self.probe_get.invalidate(&dn.to_string());
                if let Some(agent) = agent {
                    self.agent_probes.invalidate(&agent.to_string());
                }
            }
            EntityKind::ProbeGroup => {
                self.probe_group_list.invalidate(&user_key.to_string());
                self.probe_group_get.invalidate(&dn.to_string());
            }
        }
    }
}
