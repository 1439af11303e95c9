use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::error::StoreError;
use crate::kv::{KvAdapter, KvOp, KvReply};

/// Redis-backed [`KvAdapter`]. The logical DB is selected once, at
/// [`RedisKv::connect`] (§4.2's "selected once at startup"); the
/// connection manager transparently reconnects on transient failures but
/// every call still propagates the error upward rather than retrying
/// silently, per §4.2.
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| StoreError::Kv(format!("open {url}: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Kv(format!("connect {url}: {e}")))?;
        Ok(Self { conn })
    }
}

fn kv_err(e: redis::RedisError) -> StoreError {
    StoreError::Kv(e.to_string())
}

#[async_trait]
impl KvAdapter for RedisKv {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.hget(key, field).await.map_err(kv_err)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.hset(key, field, value).await.map_err(kv_err)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(kv_err)
    }

    async fn hincrby(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.hincr(key, field, by).await.map_err(kv_err)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.sadd(key, member).await.map_err(kv_err)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.srem(key, member).await.map_err(kv_err)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(kv_err)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.zadd(key, member, score).await.map_err(kv_err)
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.zrem(key, member).await.map_err(kv_err)
    }

    async fn zrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>, StoreError> {
        let mut conn = self.conn.clone();
        let flat: Vec<(String, f64)> = conn
            .zrange_withscores(key, start as isize, stop as isize)
            .await
            .map_err(kv_err)?;
        Ok(flat)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.del(key).await.map_err(kv_err)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.keys(pattern).await.map_err(kv_err)
    }

    async fn tx(&self, ops: Vec<KvOp>) -> Result<Vec<KvReply>, StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                KvOp::HSet { key, field, value } => {
                    pipe.hset(key, field, value).ignore();
                }
                KvOp::HIncrBy { key, field, by } => {
                    pipe.hincr(key, field, *by);
                }
                KvOp::SAdd { key, member } => {
                    pipe.sadd(key, member).ignore();
                }
                KvOp::SRem { key, member } => {
                    pipe.srem(key, member).ignore();
                }
                KvOp::ZAdd { key, member, score } => {
                    pipe.zadd(key, member, *score).ignore();
                }
                KvOp::ZRem { key, member } => {
                    pipe.zrem(key, member).ignore();
                }
                KvOp::Del { key } => {
                    pipe.del(key).ignore();
                }
            }
        }
        let mut conn = self.conn.clone();
        let raw: Vec<i64> = pipe.query_async(&mut conn).await.map_err(kv_err)?;

        // Only `HIncrBy` replies carry a value the caller needs back; every
        // other op was piped with `.ignore()` above.
        let mut incr_values = raw.into_iter();
        Ok(ops
            .iter()
            .map(|op| match op {
                KvOp::HIncrBy { .. } => KvReply::Int(incr_values.next().unwrap_or(0)),
                _ => KvReply::Ok,
            })
            .collect())
    }
}
