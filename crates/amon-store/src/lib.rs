pub mod directory;
pub mod dn;
pub mod error;
pub mod filter;
pub mod kv;
pub mod ldap_directory;
pub mod memory_directory;
pub mod memory_kv;
pub mod redis_kv;
pub mod user_resolver;

pub use directory::{DirectoryAdapter, Entry, SearchScope};
pub use error::StoreError;
pub use kv::{KvAdapter, KvOp, KvReply};
pub use ldap_directory::LdapDirectory;
pub use memory_directory::InMemoryDirectory;
pub use memory_kv::InMemoryKv;
pub use redis_kv::RedisKv;
pub use user_resolver::{ResolverOutcome, UserResolver};
