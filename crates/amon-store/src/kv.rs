use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::StoreError;

/// One command in an atomic multi-op (§4.2's `tx`).
#[derive(Debug, Clone)]
pub enum KvOp {
    HSet { key: String, field: String, value: String },
    HIncrBy { key: String, field: String, by: i64 },
    SAdd { key: String, member: String },
    SRem { key: String, member: String },
    ZAdd { key: String, member: String, score: f64 },
    ZRem { key: String, member: String },
    Del { key: String },
}

/// The reply for one op in a `tx` batch, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum KvReply {
    Ok,
    Int(i64),
}

/// §4.2: a named logical database selected once at startup, exposing the
/// hash/set/sorted-set primitives the maintenance engine needs, plus an
/// atomic multi-op `tx`. Every operation must tolerate and propagate a
/// transient connection error rather than panic.
#[async_trait]
pub trait KvAdapter: Send + Sync + 'static {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;
    async fn hincrby(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;
    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn zrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>, StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn tx(&self, ops: Vec<KvOp>) -> Result<Vec<KvReply>, StoreError>;
}
