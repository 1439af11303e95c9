//! §4.8 Event Router: accept events from relays, match to probe -> group
//! -> owner, check maintenance, fan out to notification plugins.
//!
//! Mirrors the teacher's `nclav-reconciler::reconcile` shape: a batch is
//! walked item by item, each item's failure is collected rather than
//! aborting its siblings, and the caller decides how to report the
//! aggregate (§4.8 step 6, §7's `MultiError`).

use std::collections::HashSet;
use std::sync::Arc;

use amon_domain::{ApiError, ApiErrorKind, Event};
use amon_notify::NotificationRegistry;
use amon_store::UserResolver;
use tracing::{info, warn};

use crate::contacts;
use crate::maintenance::MaintenanceEngine;
use crate::probes::{ProbeGroupModel, ProbeModel};

/// §4.8: accept a single event or an array; match to probe -> group ->
/// owner; check maintenance; fan out to notification plugins.
pub struct EventRouter {
    probes: Arc<ProbeModel>,
    groups: Arc<ProbeGroupModel>,
    maintenance: Arc<MaintenanceEngine>,
    users: Arc<UserResolver>,
    notify: Arc<NotificationRegistry>,
}

impl EventRouter {
    pub fn new(
        probes: Arc<ProbeModel>,
        groups: Arc<ProbeGroupModel>,
        maintenance: Arc<MaintenanceEngine>,
        users: Arc<UserResolver>,
        notify: Arc<NotificationRegistry>,
    ) -> Self {
        Self { probes, groups, maintenance, users, notify }
    }

    /// Processes `events` independently (§4.8: "Each event is processed
    /// independently; per-event failures are collected and do not abort
    /// siblings"). Returns `Ok(())` if every event succeeded, else a
    /// `MultiError`-wrapped (or single) `ApiError` (§4.8 step 6, §7).
    pub async fn route(&self, events: Vec<Event>) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        for event in events {
            if let Err(e) = self.route_one(event).await {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::multi(errors))
        }
    }

    async fn route_one(&self, event: Event) -> Result<(), ApiError> {
        event.validate().map_err(ApiError::from)?;

        // Step 1: load the probe. Unresolvable probes fail the event, not
        // the batch (§4.8 step 1, §8 scenario: "unknown probes as 404").
        let probe_uuid = event.probe_uuid.expect("validated above");
        let probe = self
            .probes
            .get(event.user, probe_uuid)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::not_found(format!("probe {probe_uuid} not found for user {}", event.user)))?;

        if probe.user != event.user {
            return Err(ApiError::new(
                ApiErrorKind::InvalidArgument,
                format!("probe {probe_uuid} does not belong to user {}", event.user),
            ));
        }

        // Step 2: load its probe group, if any.
        let group = match probe.group {
            Some(group_id) => self.groups.get(event.user, group_id).await.map_err(ApiError::from)?,
            None => None,
        };

        // Step 3: suppress if the event falls inside a maintenance window.
        let window = self
            .maintenance
            .is_event_in_maintenance(&event, group.as_ref().map(|g| g.uuid))
            .await
            .map_err(ApiError::from)?;
        if let Some(window) = window {
            info!(user = %event.user, probe = %probe_uuid, maintenance_id = %window.id, "event suppressed by maintenance window");
            return Ok(());
        }

        // Step 4: contacts = probe.contacts U group.contacts, de-duplicated.
        let mut seen = HashSet::new();
        let mut urns = Vec::new();
        for urn in probe.contacts.iter().chain(group.iter().flat_map(|g| g.contacts.iter())) {
            if seen.insert(urn.clone()) {
                urns.push(urn.clone());
            }
        }

        // Step 5: resolve and notify each contact against the owner's
        // directory record.
        let owner = self
            .users
            .resolve(&probe.user.to_string())
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::not_found(format!("owner {} of probe {probe_uuid} not found", probe.user)))?;
        for urn in &urns {
            self.notify_one(&owner, &probe, urn).await;
        }

        Ok(())
    }

    /// §4.8 step 5: resolve the URN; a missing address raises a config
    /// alarm (logged, never fails the event); otherwise dispatch to the
    /// medium's plugin. Plugin failures are logged and absorbed (§7).
    async fn notify_one(&self, owner: &amon_domain::User, probe: &amon_domain::Probe, urn: &str) {
        let parsed = match contacts::parse_urn(urn) {
            Ok(p) => p,
            Err(e) => {
                warn!(probe = %probe.uuid, %urn, error = %e, "malformed contact urn");
                return;
            }
        };
        let plugin = match self.notify.for_medium(&parsed.attr_name) {
            Ok(p) => p,
            Err(e) => {
                warn!(probe = %probe.uuid, %urn, error = %e, "no plugin accepts this contact medium");
                return;
            }
        };
        let Some(address) = owner.attribute(&parsed.attr_name) else {
            warn!(probe = %probe.uuid, %urn, owner = %probe.user, "config alarm: contact has no address");
            return;
        };
        let probe_name = probe.name.as_deref().unwrap_or("probe");
        let message = format!("probe {probe_name} transitioned");
        if let Err(e) = plugin.notify(probe_name, address, &message).await {
            warn!(probe = %probe.uuid, %urn, error = %e, "notification delivery failed, absorbed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amon_cache::{CacheRegistry, RegistrySettings};
    use amon_domain::{AgentId, EventId, MachineId, Probe, ProbeId, UserId};
    use amon_notify::WebhookPlugin;
    use amon_store::InMemoryDirectory;
    use uuid::Uuid;

    fn cache() -> Arc<CacheRegistry> {
        let cs = amon_cache::CacheSettings { capacity: 0, ttl_secs: 30 };
        Arc::new(CacheRegistry::new(RegistrySettings {
            disabled: false,
            probe_list: cs,
            probe_get: cs,
            probe_group_list: cs,
            probe_group_get: cs,
            agent_probes: cs,
            user_resolve: cs,
        }))
    }

    async fn put_user(dir: &InMemoryDirectory, uuid: Uuid, attrs: &[(&str, &str)]) {
        let mut e = amon_store::Entry::new();
        e.insert("objectclass".into(), vec!["sdcperson".into()]);
        e.insert("uuid".into(), vec![uuid.to_string()]);
        e.insert("login".into(), vec!["owner".into()]);
        e.insert("email".into(), vec!["owner@example.com".into()]);
        for (k, v) in attrs {
            e.insert((*k).to_string(), vec![(*v).to_string()]);
        }
        let dn = amon_store::dn::user_dn(&uuid.to_string());
        dir.put(&dn, e).await.unwrap();
    }

    struct Harness {
        probes: Arc<ProbeModel>,
        groups: Arc<ProbeGroupModel>,
        maintenance: Arc<MaintenanceEngine>,
        users: Arc<UserResolver>,
        notify: Arc<NotificationRegistry>,
        dir: Arc<InMemoryDirectory>,
    }

    fn setup() -> Harness {
        let dir = Arc::new(InMemoryDirectory::new());
        let dir_dyn: Arc<dyn amon_store::DirectoryAdapter> = dir.clone();
        let cache = cache();
        let probes = Arc::new(ProbeModel::new(
            dir_dyn.clone(),
            cache.clone(),
            Arc::new(crate::probe_kinds::ProbeKindRegistry::with_builtins()),
            Arc::new(crate::server_inventory::InMemoryServerInventory::new()),
            Arc::new(crate::vm_metadata::InMemoryVmMetadata::new()),
            UserId(Uuid::new_v4()),
        ));
        let groups = Arc::new(ProbeGroupModel::new(dir_dyn.clone(), cache));
        let kv: Arc<dyn amon_store::KvAdapter> = Arc::new(amon_store::InMemoryKv::new());
        let maintenance = MaintenanceEngine::new(kv);
        let users = Arc::new(UserResolver::new(dir_dyn, 100, 60));
        let notify = Arc::new(NotificationRegistry::new(vec![Arc::new(WebhookPlugin::new("webhook"))]));
        Harness { probes, groups, maintenance, users, notify, dir }
    }

    fn router(h: &Harness) -> EventRouter {
        EventRouter::new(h.probes.clone(), h.groups.clone(), h.maintenance.clone(), h.users.clone(), h.notify.clone())
    }

    #[tokio::test]
    async fn unresolvable_probe_fails_its_own_event_only() {
        let h = setup();
        let router = router(&h);
        let user = UserId(Uuid::new_v4());
        let event = Event {
            uuid: EventId(Uuid::new_v4()),
            version: 1,
            user,
            time: 1,
            machine: None,
            probe_uuid: Some(ProbeId(Uuid::new_v4())),
            kind: "state-change".into(),
            value: serde_json::json!("ok"),
            data: None,
            status: "error".into(),
        };
        let err = router.route(vec![event]).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::ResourceNotFound);
    }

    #[tokio::test]
    async fn maintenance_window_suppresses_with_zero_notifications() {
        let h = setup();
        let user = UserId(Uuid::new_v4());
        put_user(&h.dir, user.as_uuid(), &[("webhook", "https://hooks.example.com/x")]).await;
        let machine = MachineId(Uuid::new_v4());
        let agent = AgentId(machine.as_uuid());
        let probe = Probe {
            uuid: ProbeId(Uuid::new_v4()),
            user,
            name: Some("disk".into()),
            kind: "log-scan".into(),
            agent,
            machine,
            group: None,
            contacts: vec!["webhook".into()],
            config: None,
            disabled: false,
            run_in_vm_host: false,
        };
        let actor = amon_domain::User { uuid: user, login: "u".into(), email: "u@example.com".into(), attributes: Default::default(), is_operator: false };
        let probe = h.probes.put(&actor, probe).await.unwrap();

        h.maintenance.create(user, 1_000_000, 4_600_000, None, amon_domain::MaintenanceScope::All).await.unwrap();

        let router = router(&h);
        let event = Event {
            uuid: EventId(Uuid::new_v4()),
            version: 1,
            user,
            time: 2_000_000,
            machine: Some(machine),
            probe_uuid: Some(probe.uuid),
            kind: "state-change".into(),
            value: serde_json::json!("ok"),
            data: None,
            status: "error".into(),
        };
        assert!(router.route(vec![event]).await.is_ok());
    }

    #[tokio::test]
    async fn batch_partial_failure_does_not_abort_siblings() {
        let h = setup();
        let user = UserId(Uuid::new_v4());
        put_user(&h.dir, user.as_uuid(), &[]).await;
        let machine = MachineId(Uuid::new_v4());
        let agent = AgentId(machine.as_uuid());
        let probe = Probe {
            uuid: ProbeId(Uuid::new_v4()),
            user,
            name: Some("disk".into()),
            kind: "log-scan".into(),
            agent,
            machine,
            group: None,
            contacts: vec![],
            config: None,
            disabled: false,
            run_in_vm_host: false,
        };
        let actor = amon_domain::User { uuid: user, login: "u".into(), email: "u@example.com".into(), attributes: Default::default(), is_operator: false };
        let probe = h.probes.put(&actor, probe).await.unwrap();

        let router = router(&h);
        let good = Event {
            uuid: EventId(Uuid::new_v4()),
            version: 1,
            user,
            time: 1,
            machine: Some(machine),
            probe_uuid: Some(probe.uuid),
            kind: "state-change".into(),
            value: serde_json::json!("ok"),
            data: None,
            status: "error".into(),
        };
        let mut bad = good.clone();
        bad.uuid = EventId(Uuid::new_v4());
        bad.probe_uuid = Some(ProbeId(Uuid::new_v4()));

        let err = router.route(vec![good, bad]).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::ResourceNotFound);
    }

    #[tokio::test]
    async fn config_alarm_on_missing_address_does_not_fail_event() {
        let h = setup();
        let user = UserId(Uuid::new_v4());
        put_user(&h.dir, user.as_uuid(), &[]).await;
        let machine = MachineId(Uuid::new_v4());
        let agent = AgentId(machine.as_uuid());
        let probe = Probe {
            uuid: ProbeId(Uuid::new_v4()),
            user,
            name: Some("disk".into()),
            kind: "log-scan".into(),
            agent,
            machine,
            group: None,
            contacts: vec!["webhook".into()],
            config: None,
            disabled: false,
            run_in_vm_host: false,
        };
        let actor = amon_domain::User { uuid: user, login: "u".into(), email: "u@example.com".into(), attributes: Default::default(), is_operator: false };
        let probe = h.probes.put(&actor, probe).await.unwrap();

        let router = router(&h);
        let event = Event {
            uuid: EventId(Uuid::new_v4()),
            version: 1,
            user,
            time: 1,
            machine: Some(machine),
            probe_uuid: Some(probe.uuid),
            kind: "state-change".into(),
            value: serde_json::json!("ok"),
            data: None,
            status: "error".into(),
        };
        assert!(router.route(vec![event]).await.is_ok());
    }
}
