mod raw;
mod config;
mod loader;
pub mod error;

pub use config::{
    CacheConfig, CacheEntryConfig, Config, DirectoryConfig, HttpConfig, KvConfig, PluginConfig,
};
pub use error::ConfigError;
pub use loader::load_config;
