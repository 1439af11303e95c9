use amon_domain::UserId;

#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    pub directory: DirectoryConfig,
    pub kv: KvConfig,
    pub cache: CacheConfig,
    pub notification_plugins: Vec<PluginConfig>,
    pub admin_user: UserId,
    pub server_inventory_url: Option<String>,
    pub vm_metadata_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub url: String,
    pub bind_dn: String,
    pub bind_password: String,
}

#[derive(Debug, Clone)]
pub struct KvConfig {
    pub url: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheEntryConfig {
    pub capacity: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub disabled: bool,
    pub probe_list: CacheEntryConfig,
    pub probe_get: CacheEntryConfig,
    pub probe_group_list: CacheEntryConfig,
    pub probe_group_get: CacheEntryConfig,
    pub agent_probes: CacheEntryConfig,
    pub user_resolve: CacheEntryConfig,
}

#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub name: String,
    pub kind: String,
    pub config: serde_json::Value,
}
