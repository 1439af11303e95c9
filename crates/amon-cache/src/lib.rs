pub mod cache;
pub mod registry;

pub use cache::{Cache, CacheEntry};
pub use registry::{CacheRegistry, CacheSettings, EntityKind, RegistrySettings};
