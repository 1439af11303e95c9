mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use amon_api::AppState;
use amon_cache::{CacheRegistry, CacheSettings, RegistrySettings};
use amon_config::{CacheEntryConfig, Config};
use amon_master::{
    AgentProbesService, EventRouter, HttpServerInventory, HttpVmMetadata, InMemoryServerInventory,
    InMemoryVmMetadata, MaintenanceEngine, ProbeGroupModel, ProbeKindRegistry, ProbeModel, ServerInventory,
    VmMetadata,
};
use amon_notify::{build_plugin, NotificationRegistry, PluginSpec};
use amon_store::{DirectoryAdapter, InMemoryDirectory, InMemoryKv, KvAdapter, LdapDirectory, RedisKv, UserResolver};

use cli::{Cli, Command};

const API_VERSION: &str = "1.0.0";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, ephemeral } => serve(config, ephemeral).await,
    }
}

async fn serve(config_path: std::path::PathBuf, ephemeral: bool) -> Result<()> {
    let config = amon_config::load_config(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let directory: Arc<dyn DirectoryAdapter> = if ephemeral {
        tracing::warn!("running with an in-memory directory — state will be lost on restart");
        Arc::new(InMemoryDirectory::new())
    } else {
        Arc::new(
            LdapDirectory::connect(&config.directory.url, &config.directory.bind_dn, &config.directory.bind_password)
                .await
                .context("connecting to directory service")?,
        )
    };

    let kv: Arc<dyn KvAdapter> = if ephemeral {
        tracing::warn!("running with an in-memory KV store — state will be lost on restart");
        Arc::new(InMemoryKv::new())
    } else {
        Arc::new(RedisKv::connect(&config.kv.url).await.context("connecting to KV store")?)
    };

    let cache = Arc::new(CacheRegistry::new(registry_settings(&config)));

    let users = Arc::new(UserResolver::new(
        directory.clone(),
        config.cache.user_resolve.capacity,
        config.cache.user_resolve.ttl_secs,
    ));

    let kinds = Arc::new(ProbeKindRegistry::with_builtins());

    let server_inventory: Arc<dyn ServerInventory> = match &config.server_inventory_url {
        Some(url) => Arc::new(HttpServerInventory::new(url.clone())),
        None => {
            tracing::warn!("no server_inventory_url configured — no agent is treated as a physical server");
            Arc::new(InMemoryServerInventory::new())
        }
    };

    let vm_metadata: Arc<dyn VmMetadata> = match &config.vm_metadata_url {
        Some(url) => Arc::new(HttpVmMetadata::new(url.clone())),
        None => {
            tracing::warn!("no vm_metadata_url configured — no machine resolves as a VM");
            Arc::new(InMemoryVmMetadata::new())
        }
    };

    let probes = Arc::new(ProbeModel::new(
        directory.clone(),
        cache.clone(),
        kinds,
        server_inventory,
        vm_metadata,
        config.admin_user,
    ));
    let groups = Arc::new(ProbeGroupModel::new(directory.clone(), cache.clone()));
    let agent_probes = Arc::new(AgentProbesService::new(directory.clone(), cache.clone()));

    let maintenance = MaintenanceEngine::new(kv);
    // Existing windows survive a restart in the KV store; re-arm against
    // whatever is already there (§4.7's reaper is otherwise only poked on
    // create/delete of this process's own lifetime).
    maintenance.rearm_reaper().await;

    let plugins = config
        .notification_plugins
        .iter()
        .map(|p| build_plugin(&PluginSpec { name: p.name.clone(), kind: p.kind.clone(), config: p.config.clone() }))
        .collect::<Result<Vec<_>, _>>()
        .context("building notification plugins")?;
    let notify = Arc::new(NotificationRegistry::new(plugins));

    let events = Arc::new(EventRouter::new(probes.clone(), groups.clone(), maintenance.clone(), users.clone(), notify));

    let state = AppState {
        users,
        probes,
        groups,
        maintenance,
        events,
        agent_probes,
        api_version: Arc::from(API_VERSION),
    };

    let app = amon_api::build_app(state);

    let addr = format!("{}:{}", config.http.bind, config.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "amond listening");
    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}

fn registry_settings(config: &Config) -> RegistrySettings {
    let entry = |e: CacheEntryConfig| CacheSettings { capacity: e.capacity, ttl_secs: e.ttl_secs };
    RegistrySettings {
        disabled: config.cache.disabled,
        probe_list: entry(config.cache.probe_list),
        probe_get: entry(config.cache.probe_get),
        probe_group_list: entry(config.cache.probe_group_list),
        probe_group_get: entry(config.cache.probe_group_get),
        agent_probes: entry(config.cache.agent_probes),
        user_resolve: entry(config.cache.user_resolve),
    }
}
