use serde::{Deserialize, Serialize};

/// Raw YAML representation of the bootstrap config (§6).
#[derive(Debug, Deserialize, Serialize)]
pub struct RawConfig {
    pub http: RawHttp,
    pub directory: RawDirectory,
    pub kv: RawKv,
    #[serde(default)]
    pub cache: RawCache,
    #[serde(default)]
    pub notification_plugins: Vec<RawPluginConfig>,
    pub admin_user: String,
    #[serde(default)]
    pub server_inventory_url: Option<String>,
    #[serde(default)]
    pub vm_metadata_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawHttp {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawDirectory {
    pub url: String,
    pub bind_dn: String,
    pub bind_password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawKv {
    pub url: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawCache {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default = "default_cache_entry")]
    pub probe_list: RawCacheEntry,
    #[serde(default = "default_cache_entry")]
    pub probe_get: RawCacheEntry,
    #[serde(default = "default_cache_entry")]
    pub probe_group_list: RawCacheEntry,
    #[serde(default = "default_cache_entry")]
    pub probe_group_get: RawCacheEntry,
    #[serde(default = "default_cache_entry")]
    pub agent_probes: RawCacheEntry,
    #[serde(default = "default_cache_entry")]
    pub user_resolve: RawCacheEntry,
}

fn default_cache_entry() -> RawCacheEntry {
    RawCacheEntry { capacity: 0, ttl_secs: 30 }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RawCacheEntry {
    #[serde(default)]
    pub capacity: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawPluginConfig {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
}
