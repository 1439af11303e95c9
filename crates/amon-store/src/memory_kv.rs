use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::kv::{KvAdapter, KvOp, KvReply};

#[derive(Debug, Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, HashSet<String>>,
    zsets: HashMap<String, HashMap<String, f64>>,
}

impl Inner {
    fn apply(&mut self, op: &KvOp) -> KvReply {
        match op {
            KvOp::HSet { key, field, value } => {
                self.hashes.entry(key.clone()).or_default().insert(field.clone(), value.clone());
                KvReply::Ok
            }
            KvOp::HIncrBy { key, field, by } => {
                let entry = self.hashes.entry(key.clone()).or_default().entry(field.clone()).or_insert_with(|| "0".to_string());
                let n: i64 = entry.parse().unwrap_or(0) + by;
                *entry = n.to_string();
                KvReply::Int(n)
            }
            KvOp::SAdd { key, member } => {
                self.sets.entry(key.clone()).or_default().insert(member.clone());
                KvReply::Ok
            }
            KvOp::SRem { key, member } => {
                if let Some(s) = self.sets.get_mut(key) {
                    s.remove(member);
                }
                KvReply::Ok
            }
            KvOp::ZAdd { key, member, score } => {
                self.zsets.entry(key.clone()).or_default().insert(member.clone(), *score);
                KvReply::Ok
            }
            KvOp::ZRem { key, member } => {
                if let Some(z) = self.zsets.get_mut(key) {
                    z.remove(member);
                }
                KvReply::Ok
            }
            KvOp::Del { key } => {
                self.hashes.remove(key);
                self.sets.remove(key);
                self.zsets.remove(key);
                KvReply::Ok
            }
        }
    }
}

/// In-memory [`KvAdapter`]. `tx` executes the enclosed ops against a single
/// write-lock guard, so it is atomic by construction (§4.2).
#[derive(Debug, Clone, Default)]
pub struct InMemoryKv {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resolve_slice_bounds(len: usize, start: isize, stop: isize) -> (usize, usize) {
    let norm = |i: isize| -> isize {
        if i < 0 {
            (len as isize + i).max(0)
        } else {
            i
        }
    };
    let start = norm(start).min(len as isize) as usize;
    let stop = norm(stop).min(len as isize - 1);
    (start, stop.max(-1) as usize)
}

#[async_trait]
impl KvAdapter for InMemoryKv {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.apply(&KvOp::HSet { key: key.to_string(), field: field.to_string(), value: value.to_string() });
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hincrby(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
        let mut guard = self.inner.write().await;
        match guard.apply(&KvOp::HIncrBy { key: key.to_string(), field: field.to_string(), by }) {
            KvReply::Int(n) => Ok(n),
            _ => unreachable!(),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.apply(&KvOp::SAdd { key: key.to_string(), member: member.to_string() });
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.apply(&KvOp::SRem { key: key.to_string(), member: member.to_string() });
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.sets.get(key).map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.apply(&KvOp::ZAdd { key: key.to_string(), member: member.to_string(), score });
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.apply(&KvOp::ZRem { key: key.to_string(), member: member.to_string() });
        Ok(())
    }

    async fn zrange_withscores(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>, StoreError> {
        let guard = self.inner.read().await;
        let mut members: Vec<(String, f64)> = guard
            .zsets
            .get(key)
            .map(|z| z.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();
        members.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then_with(|| a.0.cmp(&b.0)));
        if members.is_empty() {
            return Ok(members);
        }
        let (lo, hi) = resolve_slice_bounds(members.len(), start, stop);
        if lo > hi || lo >= members.len() {
            return Ok(vec![]);
        }
        Ok(members[lo..=hi.min(members.len() - 1)].to_vec())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.apply(&KvOp::Del { key: key.to_string() });
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        // Only the trivial "exact" and trailing-`*` prefix patterns are
        // needed by the master; anything fancier is not issued against
        // this backend.
        let guard = self.inner.read().await;
        let all = guard
            .hashes
            .keys()
            .chain(guard.sets.keys())
            .chain(guard.zsets.keys())
            .cloned()
            .collect::<HashSet<_>>();
        if let Some(prefix) = pattern.strip_suffix('*') {
            Ok(all.into_iter().filter(|k| k.starts_with(prefix)).collect())
        } else {
            Ok(all.into_iter().filter(|k| k == pattern).collect())
        }
    }

    async fn tx(&self, ops: Vec<KvOp>) -> Result<Vec<KvReply>, StoreError> {
        let mut guard = self.inner.write().await;
        Ok(ops.iter().map(|op| guard.apply(op)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hincrby_starts_at_zero() {
        let kv = InMemoryKv::new();
        assert_eq!(kv.hincrby("counters", "u1", 1).await.unwrap(), 1);
        assert_eq!(kv.hincrby("counters", "u1", 1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn zrange_withscores_is_sorted_ascending() {
        let kv = InMemoryKv::new();
        kv.zadd("idx", "b", 20.0).await.unwrap();
        kv.zadd("idx", "a", 10.0).await.unwrap();
        let got = kv.zrange_withscores("idx", 0, 0).await.unwrap();
        assert_eq!(got, vec![("a".to_string(), 10.0)]);
    }

    #[tokio::test]
    async fn tx_is_all_or_nothing_within_one_lock() {
        let kv = InMemoryKv::new();
        let replies = kv
            .tx(vec![
                KvOp::SAdd { key: "s".into(), member: "1".into() },
                KvOp::ZAdd { key: "z".into(), member: "maintenance:u:1".into(), score: 100.0 },
                KvOp::HSet { key: "h".into(), field: "f".into(), value: "v".into() },
            ])
            .await
            .unwrap();
        assert_eq!(replies.len(), 3);
        assert_eq!(kv.smembers("s").await.unwrap(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn del_removes_from_every_structure() {
        let kv = InMemoryKv::new();
        kv.hset("k", "f", "v").await.unwrap();
        kv.del("k").await.unwrap();
        assert!(kv.hgetall("k").await.unwrap().is_empty());
    }
}
