//! §4.7 Maintenance Engine: create/list/delete maintenance windows, the
//! time-ordered expiry reaper, and the `isEventInMaintenance` predicate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use amon_domain::{Event, MaintenanceId, MaintenanceScope, MaintenanceWindow, ProbeGroupId, UserId};
use amon_store::{KvAdapter, KvOp};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::MasterError;

/// Guards against hot loops on skewed clocks (§4.7).
pub const MIN_REAPER_GAP_MS: i64 = 100;
const REAPER_ERROR_BACKOFF: Duration = Duration::from_secs(300);

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as i64
}

fn maintenances_set_key(user: UserId) -> String {
    format!("maintenances:{user}")
}

fn maint_key(user: UserId, id: MaintenanceId) -> String {
    format!("maintenance:{user}:{id}")
}

fn parse_maint_key(key: &str) -> Option<(UserId, MaintenanceId)> {
    let mut parts = key.splitn(3, ':');
    if parts.next()? != "maintenance" {
        return None;
    }
    let user = parts.next()?.parse::<uuid::Uuid>().ok()?;
    let id = parts.next()?.parse::<u64>().ok()?;
    Some((UserId(user), MaintenanceId(id)))
}

fn window_to_fields(w: &MaintenanceWindow) -> Vec<(String, String)> {
    vec![
        ("id".to_string(), w.id.0.to_string()),
        ("user".to_string(), w.user.to_string()),
        ("start".to_string(), w.start.to_string()),
        ("end".to_string(), w.end.to_string()),
        ("notes".to_string(), w.notes.clone().unwrap_or_default()),
        ("has_notes".to_string(), if w.notes.is_some() { "1" } else { "0" }.to_string()),
        ("scope".to_string(), serde_json::to_string(&w.scope).unwrap_or_default()),
    ]
}

/// `None` means the hash is missing required fields — a bogus record
/// (§4.7's "drop entries that fail to validate").
fn fields_to_window(map: &HashMap<String, String>) -> Option<MaintenanceWindow> {
    let id = map.get("id")?.parse().ok()?;
    let user = map.get("user")?.parse::<uuid::Uuid>().ok()?;
    let start = map.get("start")?.parse().ok()?;
    let end = map.get("end")?.parse().ok()?;
    let has_notes = map.get("has_notes").map(|s| s == "1").unwrap_or(false);
    let notes = if has_notes { map.get("notes").cloned() } else { None };
    let scope: MaintenanceScope = serde_json::from_str(map.get("scope")?).ok()?;
    Some(MaintenanceWindow { id: MaintenanceId(id), user: UserId(user), start, end, notes, scope })
}

/// §4.7/§9: the maintenance-expiry timer is a process-wide singleton,
/// mutable, guarded by an explicit mutex (§5/§9). `MaintenanceEngine`
/// must therefore be held behind `Arc` so its reaper task can hold a
/// handle back to it.
pub struct MaintenanceEngine {
    kv: Arc<dyn KvAdapter>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl MaintenanceEngine {
    pub fn new(kv: Arc<dyn KvAdapter>) -> Arc<Self> {
        Arc::new(Self { kv, reaper: Mutex::new(None) })
    }

    /// Atomically: `id <- HINCRBY maintIds[user] 1`; construct window;
    /// multi-op add to the per-user set, the global time index, and the
    /// hash (§4.7 Create). Pokes the reaper on success.
    pub async fn create(
        self: &Arc<Self>,
        user: UserId,
        start: i64,
        end: i64,
        notes: Option<String>,
        scope: MaintenanceScope,
    ) -> Result<MaintenanceWindow, MasterError> {
        let id = self.kv.hincrby("maintenanceIds", &user.to_string(), 1).await?;
        let window = MaintenanceWindow { id: MaintenanceId(id as u64), user, start, end, notes, scope };
        window.validate_range()?;

        let key = maint_key(user, window.id);
        let mut ops = vec![
            KvOp::SAdd { key: maintenances_set_key(user), member: window.id.0.to_string() },
            KvOp::ZAdd { key: "maintenancesByEnd".to_string(), member: key.clone(), score: window.end as f64 },
        ];
        for (field, value) in window_to_fields(&window) {
            ops.push(KvOp::HSet { key: key.clone(), field, value });
        }
        self.kv.tx(ops).await?;
        info!(%user, id = %window.id, "maintenance window created");
        self.rearm_reaper().await;
        Ok(window)
    }

    /// `None` fields or a missing counter both resolve to `NotFound`; an
    /// id that was issued (`<= counter`) but no longer present resolves
    /// to `Gone` (§7, §8 scenario 5).
    pub async fn get(&self, user: UserId, id: MaintenanceId) -> Result<MaintenanceWindow, MasterError> {
        let key = maint_key(user, id);
        let map = self.kv.hgetall(&key).await?;
        if let Some(w) = fields_to_window(&map) {
            return Ok(w);
        }
        let counter: u64 = self
            .kv
            .hget("maintenanceIds", &user.to_string())
            .await?
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        if id.0 <= counter && id.0 > 0 {
            Err(MasterError::Gone(format!("maintenance {id}")))
        } else {
            Err(MasterError::NotFound(format!("maintenance {id}")))
        }
    }

    /// Reads the per-user set, fetches each hash in parallel, drops
    /// entries that fail to validate and schedules a background delete
    /// for each so the reaper never spins on it (§4.7 List).
    pub async fn list(self: &Arc<Self>, user: UserId) -> Result<Vec<MaintenanceWindow>, MasterError> {
        let ids = self.kv.smembers(&maintenances_set_key(user)).await?;
        let fetches = ids.iter().map(|id_str| {
            let kv = self.kv.clone();
            let key = maint_key_from_raw(user, id_str);
            let id_str = id_str.clone();
            async move { (id_str, kv.hgetall(&key).await) }
        });
        let results = futures::future::join_all(fetches).await;

        let mut windows = Vec::with_capacity(results.len());
        for (id_str, map_result) in results {
            let map = map_result?;
            match fields_to_window(&map) {
                Some(w) => windows.push(w),
                None => {
                    warn!(%user, id = %id_str, "bogus maintenance record, scheduling self-heal delete");
                    if let Ok(id_num) = id_str.parse::<u64>() {
                        let engine = Arc::clone(self);
                        tokio::spawn(async move {
                            if let Err(e) = engine.raw_delete(user, MaintenanceId(id_num)).await {
                                warn!(error = %e, "self-heal delete of bogus maintenance record failed");
                            }
                            engine.rearm_reaper().await;
                        });
                    }
                }
            }
        }
        windows.sort_by_key(|w| w.id);
        Ok(windows)
    }

    /// Multi-op remove from the per-user set, the time index, and the
    /// hash (§4.7 Delete), then the `handleMaintenanceEnd` hook and a
    /// reaper poke.
    pub async fn delete(self: &Arc<Self>, user: UserId, id: MaintenanceId) -> Result<(), MasterError> {
        self.raw_delete(user, id).await?;
        self.handle_maintenance_end(user, id).await;
        self.rearm_reaper().await;
        Ok(())
    }

    async fn raw_delete(&self, user: UserId, id: MaintenanceId) -> Result<(), MasterError> {
        let key = maint_key(user, id);
        self.kv
            .tx(vec![
                KvOp::SRem { key: maintenances_set_key(user), member: id.0.to_string() },
                KvOp::ZRem { key: "maintenancesByEnd".to_string(), member: key.clone() },
                KvOp::Del { key },
            ])
            .await?;
        Ok(())
    }

    /// §9: "referenced on delete but its behavior beyond 'notify the
    /// router' is unspecified; reasonable implementations make it a
    /// no-op." Resolved as a no-op hook point — exposed so a future
    /// event-router integration can re-evaluate suppressed alarms, but no
    /// such integration is built here (see DESIGN.md).
    async fn handle_maintenance_end(&self, user: UserId, id: MaintenanceId) {
        debug!(%user, %id, "maintenance window ended");
    }

    /// §4.7's `isEventInMaintenance`: linear O(W) scan, first match wins.
    pub async fn is_event_in_maintenance(
        self: &Arc<Self>,
        event: &Event,
        group: Option<ProbeGroupId>,
    ) -> Result<Option<MaintenanceWindow>, MasterError> {
        let windows = self.list(event.user).await?;
        Ok(windows.into_iter().find(|w| w.covers_time(event.time) && w.scope.matches(event.probe_uuid, group, event.machine)))
    }

    /// Operator-only cross-user listing (§4.10's `GET /maintenances`):
    /// scans the per-user set index for every user with at least one
    /// window, then lists each. Not cached — this endpoint is
    /// operator/debugging traffic, not the hot path §4.3 optimizes for.
    pub async fn list_all(self: &Arc<Self>) -> Result<Vec<MaintenanceWindow>, MasterError> {
        let set_keys = self.kv.keys("maintenances:*").await?;
        let mut all = Vec::new();
        for key in set_keys {
            let Some(user_str) = key.strip_prefix("maintenances:") else { continue };
            let Ok(user) = user_str.parse::<uuid::Uuid>() else { continue };
            all.extend(self.list(UserId(user)).await?);
        }
        all.sort_by_key(|w| (w.user.to_string(), w.id));
        Ok(all)
    }

    /// Re-arming is idempotent: cancel any prior timer before scheduling
    /// a fresh one (§5, §9). Must be called whenever a window is
    /// created, deleted, or found bogus.
    pub async fn rearm_reaper(self: &Arc<Self>) {
        let mut guard = self.reaper.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        let engine = Arc::clone(self);
        *guard = Some(tokio::spawn(async move { engine.reap_once().await }));
    }

    async fn reap_once(self: Arc<Self>) {
        match self.kv.zrange_withscores("maintenancesByEnd", 0, 0).await {
            Ok(entries) => {
                let Some((key, end_score)) = entries.into_iter().next() else {
                    // Nothing scheduled; the next create() call re-arms us.
                    return;
                };
                let delay_ms = ((end_score as i64) - now_ms()).max(MIN_REAPER_GAP_MS);
                tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
                if let Err(e) = self.fire(&key).await {
                    warn!(error = %e, "maintenance reaper fire failed, backing off 5m");
                    tokio::time::sleep(REAPER_ERROR_BACKOFF).await;
                }
                self.rearm_reaper().await;
            }
            Err(e) => {
                warn!(error = %e, "maintenance reaper index read failed, backing off 5m");
                tokio::time::sleep(REAPER_ERROR_BACKOFF).await;
                self.rearm_reaper().await;
            }
        }
    }

    /// Fetch the window at `key`; if missing, just drop the stale index
    /// entry (§4.7: "if missing, reschedule"). Else delete it, which
    /// triggers `handleMaintenanceEnd`.
    async fn fire(&self, key: &str) -> Result<(), MasterError> {
        let Some((user, id)) = parse_maint_key(key) else {
            warn!(%key, "malformed maintenance index key, dropping");
            self.kv.zrem("maintenancesByEnd", key).await?;
            return Ok(());
        };
        let map = self.kv.hgetall(key).await?;
        if map.is_empty() {
            self.kv.zrem("maintenancesByEnd", key).await?;
            return Ok(());
        }
        self.raw_delete(user, id).await?;
        self.handle_maintenance_end(user, id).await;
        Ok(())
    }
}

fn maint_key_from_raw(user: UserId, id_str: &str) -> String {
    format!("maintenance:{user}:{id_str}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use amon_domain::MaintenanceScope;
    use amon_store::InMemoryKv;
    use uuid::Uuid;

    fn engine() -> Arc<MaintenanceEngine> {
        MaintenanceEngine::new(Arc::new(InMemoryKv::new()))
    }

    #[tokio::test]
    async fn create_then_list_roundtrips() {
        let engine = engine();
        let user = UserId(Uuid::new_v4());
        let w = engine.create(user, 1_000_000, 4_600_000, None, MaintenanceScope::All).await.unwrap();
        assert_eq!(w.id.0, 1);

        let listed = engine.list(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, w.id);
    }

    #[tokio::test]
    async fn ids_strictly_increase_per_user() {
        let engine = engine();
        let user = UserId(Uuid::new_v4());
        let a = engine.create(user, 0, 1, None, MaintenanceScope::All).await.unwrap();
        let b = engine.create(user, 0, 1, None, MaintenanceScope::All).await.unwrap();
        assert!(b.id.0 > a.id.0);
    }

    #[tokio::test]
    async fn delete_then_get_is_gone_not_not_found() {
        let engine = engine();
        let user = UserId(Uuid::new_v4());
        let w = engine.create(user, 0, 1, None, MaintenanceScope::All).await.unwrap();
        engine.delete(user, w.id).await.unwrap();
        assert!(matches!(engine.get(user, w.id).await, Err(MasterError::Gone(_))));
    }

    #[tokio::test]
    async fn never_issued_id_is_not_found() {
        let engine = engine();
        let user = UserId(Uuid::new_v4());
        assert!(matches!(engine.get(user, MaintenanceId(999)).await, Err(MasterError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_all_spans_every_user() {
        let engine = engine();
        let a = UserId(Uuid::new_v4());
        let b = UserId(Uuid::new_v4());
        engine.create(a, 0, 1, None, MaintenanceScope::All).await.unwrap();
        engine.create(b, 0, 1, None, MaintenanceScope::All).await.unwrap();

        let all = engine.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|w| w.user == a));
        assert!(all.iter().any(|w| w.user == b));
    }

    #[tokio::test]
    async fn is_event_in_maintenance_matches_scope_and_time() {
        let engine = engine();
        let user = UserId(Uuid::new_v4());
        engine.create(user, 1_000_000, 4_600_000, None, MaintenanceScope::All).await.unwrap();

        let mut event = amon_domain::Event {
            uuid: amon_domain::EventId(Uuid::new_v4()),
            version: 1,
            user,
            time: 2_000_000,
            machine: None,
            probe_uuid: Some(amon_domain::ProbeId(Uuid::new_v4())),
            kind: "state-change".into(),
            value: serde_json::json!("ok"),
            data: None,
            status: "error".into(),
        };
        assert!(engine.is_event_in_maintenance(&event, None).await.unwrap().is_some());

        event.time = 9_000_000;
        assert!(engine.is_event_in_maintenance(&event, None).await.unwrap().is_none());
    }
}
