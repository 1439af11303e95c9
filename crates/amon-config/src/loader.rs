use std::path::Path;
use std::str::FromStr;

use amon_domain::UserId;
use tracing::debug;

use crate::config::{CacheConfig, CacheEntryConfig, Config, DirectoryConfig, HttpConfig, KvConfig, PluginConfig};
use crate::error::ConfigError;
use crate::raw::{RawCacheEntry, RawConfig};

/// Load the bootstrap config file (§6).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: display.clone(),
        source: e,
    })?;
    let raw: RawConfig = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: display.clone(),
        source: e,
    })?;
    debug!("loaded config from {}", display);
    convert(raw, &display)
}

fn convert(raw: RawConfig, path: &str) -> Result<Config, ConfigError> {
    let admin_user = UserId::from_str(&raw.admin_user).map_err(|_| ConfigError::Conversion {
        path: path.to_string(),
        message: format!("admin_user '{}' is not a valid uuid", raw.admin_user),
    })?;

    let plugins = raw
        .notification_plugins
        .into_iter()
        .map(|p| PluginConfig { name: p.name, kind: p.kind, config: p.config })
        .collect();

    Ok(Config {
        http: HttpConfig { bind: raw.http.bind, port: raw.http.port },
        directory: DirectoryConfig {
            url: raw.directory.url,
            bind_dn: raw.directory.bind_dn,
            bind_password: raw.directory.bind_password,
        },
        kv: KvConfig { url: raw.kv.url },
        cache: CacheConfig {
            disabled: raw.cache.disabled,
            probe_list: entry(raw.cache.probe_list),
            probe_get: entry(raw.cache.probe_get),
            probe_group_list: entry(raw.cache.probe_group_list),
            probe_group_get: entry(raw.cache.probe_group_get),
            agent_probes: entry(raw.cache.agent_probes),
            user_resolve: entry(raw.cache.user_resolve),
        },
        notification_plugins: plugins,
        admin_user,
        server_inventory_url: raw.server_inventory_url,
        vm_metadata_url: raw.vm_metadata_url,
    })
}

fn entry(raw: RawCacheEntry) -> CacheEntryConfig {
    CacheEntryConfig { capacity: raw.capacity, ttl_secs: raw.ttl_secs }
}
