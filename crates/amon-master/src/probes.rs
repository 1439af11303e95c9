//! §4.5 Probe / ProbeGroup Model: `List/Get/Put/Delete`, validation, and
//! the five-rule authorization decision tree, evaluated as a linear
//! sequence of `async` steps per §9's "Callback-chained authorization"
//! redesign flag (never as nested callbacks/closures).

use std::sync::Arc;

use amon_cache::{CacheRegistry, EntityKind};
use amon_domain::{AgentId, DomainError, MachineId, Probe, ProbeGroup, ProbeGroupId, ProbeId, User, UserId};
use amon_store::{dn, DirectoryAdapter, SearchScope};
use serde_json::Value;
use tracing::warn;

use crate::error::MasterError;
use crate::probe_kinds::ProbeKindRegistry;
use crate::server_inventory::ServerInventory;
use crate::vm_metadata::VmMetadata;

pub struct ProbeModel {
    directory: Arc<dyn DirectoryAdapter>,
    cache: Arc<CacheRegistry>,
    kinds: Arc<ProbeKindRegistry>,
    server_inventory: Arc<dyn ServerInventory>,
    vm_metadata: Arc<dyn VmMetadata>,
    admin_user: UserId,
}

impl ProbeModel {
    pub fn new(
        directory: Arc<dyn DirectoryAdapter>,
        cache: Arc<CacheRegistry>,
        kinds: Arc<ProbeKindRegistry>,
        server_inventory: Arc<dyn ServerInventory>,
        vm_metadata: Arc<dyn VmMetadata>,
        admin_user: UserId,
    ) -> Self {
        Self { directory, cache, kinds, server_inventory, vm_metadata, admin_user }
    }

    /// §3: "For runLocally kinds, `agent` and `machine` must be equal
    /// (either may be omitted and inferred)." The kind isn't known until
    /// it's looked up in the registry, so the inference lives here rather
    /// than in the API handler's body-to-probe step. runInVmHost kinds
    /// get no inference — the VM's physical host can't be guessed from
    /// the VM id — so both must be given explicitly.
    pub fn resolve_target(
        &self,
        kind: &str,
        agent: Option<AgentId>,
        machine: Option<MachineId>,
    ) -> Result<(AgentId, MachineId), MasterError> {
        let kind = self.kinds.get(kind)?;
        if kind.run_locally() {
            match (agent, machine) {
                (Some(a), Some(m)) => Ok((a, m)),
                (Some(a), None) => Ok((a, MachineId(a.as_uuid()))),
                (None, Some(m)) => Ok((AgentId(m.as_uuid()), m)),
                (None, None) => Err(MasterError::MissingParameter("agent")),
            }
        } else {
            let agent = agent.ok_or(MasterError::MissingParameter("agent"))?;
            let machine = machine.ok_or(MasterError::MissingParameter("machine"))?;
            Ok((agent, machine))
        }
    }

    pub async fn list(&self, user: UserId) -> Result<Vec<Probe>, MasterError> {
        if let Some(hit) = self.cache.probe_list.get(&user.to_string()).and_then(|e| e.into_hit()) {
            return Ok(serde_json::from_value(hit).map_err(|e| MasterError::Internal(e.to_string()))?);
        }
        let entries = self
            .directory
            .search(&dn::user_base_dn(&user.to_string()), "(objectclass=amonprobe)", SearchScope::Subtree)
            .await?;
        let probes = entries.iter().filter_map(entry_to_probe).collect::<Vec<_>>();
        self.cache.probe_list.set_hit(user.to_string(), serde_json::to_value(&probes).unwrap());
        Ok(probes)
    }

    pub async fn get(&self, user: UserId, uuid: ProbeId) -> Result<Option<Probe>, MasterError> {
        let key = dn::probe_dn(&uuid.to_string(), &user.to_string());
        if let Some(hit) = self.cache.probe_get.get(&key).and_then(|e| e.into_hit()) {
            return Ok(serde_json::from_value(hit).ok());
        }
        let entry = self.directory.get(&key).await?;
        let probe = entry.as_ref().and_then(entry_to_probe);
        if let Some(p) = &probe {
            self.cache.probe_get.set_hit(key, serde_json::to_value(p).unwrap());
        }
        Ok(probe)
    }

    /// Validate, authorize, persist, invalidate — in that order (§5:
    /// cache invalidation must happen before the write is acknowledged).
    pub async fn put(&self, actor: &User, mut probe: Probe) -> Result<Probe, MasterError> {
        let kind = self.kinds.get(&probe.kind)?;
        probe.run_in_vm_host = kind.run_in_vm_host();
        probe.validate_structure(kind.run_locally())?;
        kind.validate_config(probe.config.as_ref())?;

        if let Some(group) = probe.group {
            self.check_group_ownership(probe.user, group).await?;
        }

        self.authorize_write(actor, &probe, kind.as_ref()).await?;

        let dn = dn::probe_dn(&probe.uuid.to_string(), &probe.user.to_string());
        self.directory.put(&dn, probe_to_entry(&probe)).await?;
        self.cache.invalidate_write(EntityKind::Probe, &probe.user.to_string(), &dn, Some(&probe.agent.to_string()));
        Ok(probe)
    }

    /// Delete requires the actor to be owner or operator (§4.5, §9's
    /// `authorizeDelete` open question resolved per that rule).
    pub async fn delete(&self, actor: &User, user: UserId, uuid: ProbeId) -> Result<(), MasterError> {
        let existing = self
            .get(user, uuid)
            .await?
            .ok_or_else(|| MasterError::NotFound(format!("probe {uuid}")))?;
        if actor.uuid != user && !actor.is_operator {
            return Err(MasterError::InvalidArgument("only the owner or an operator may delete this probe".into()));
        }
        let dn = dn::probe_dn(&uuid.to_string(), &user.to_string());
        self.directory.del(&dn).await?;
        self.cache.invalidate_write(EntityKind::Probe, &user.to_string(), &dn, Some(&existing.agent.to_string()));
        Ok(())
    }

    async fn check_group_ownership(&self, user: UserId, group: ProbeGroupId) -> Result<(), MasterError> {
        let dn = dn::probe_group_dn(&group.to_string(), &user.to_string());
        match self.directory.get(&dn).await? {
            Some(_) => Ok(()),
            None => Err(MasterError::InvalidArgument(format!("probe group {group} does not exist for this user"))),
        }
    }

    /// §4.5's decision tree. First matching rule authorizes or denies;
    /// everything else falls through to the next rule.
    async fn authorize_write(&self, actor: &User, probe: &Probe, kind: &dyn crate::probe_kinds::ProbeKind) -> Result<(), MasterError> {
        // Rule 1: skip-authz escape hatch, bootstrap only.
        if probe.user == self.admin_user {
            return Ok(());
        }

        // Rule 2: agent names a physical server.
        if self.server_inventory.server_exists(probe.agent).await? {
            return if actor.is_operator {
                Ok(())
            } else {
                Err(MasterError::InvalidArgument("only an operator may assign probes to a physical server".into()))
            };
        }

        // Rules 3-4 need the VM lookup; `lookup_vm` returning `None` falls
        // through to rule 5 regardless of which branch it was resolving.
        let vm = self.vm_metadata.lookup_vm(probe.machine).await?;
        if let Some(vm) = vm {
            if vm.owner == actor.uuid {
                return Ok(());
            }
            if kind.run_in_vm_host() && actor.is_operator {
                return Ok(());
            }
        }

        Err(MasterError::InvalidArgument("machine does not exist or is not owned".into()))
    }
}

fn entry_to_probe(entry: &amon_store::Entry) -> Option<Probe> {
    let raw = entry.get("probe")?.first()?;
    serde_json::from_str(raw).ok()
}

fn probe_to_entry(probe: &Probe) -> amon_store::Entry {
    let mut e = amon_store::Entry::new();
    e.insert("objectclass".to_string(), vec!["amonprobe".to_string()]);
    e.insert("probe".to_string(), vec![serde_json::to_string(probe).unwrap()]);
    e
}

fn entry_to_probe_group(entry: &amon_store::Entry) -> Option<ProbeGroup> {
    let raw = entry.get("probegroup")?.first()?;
    serde_json::from_str(raw).ok()
}

fn probe_group_to_entry(group: &ProbeGroup) -> amon_store::Entry {
    let mut e = amon_store::Entry::new();
    e.insert("objectclass".to_string(), vec!["amonprobegroup".to_string()]);
    e.insert("probegroup".to_string(), vec![serde_json::to_string(group).unwrap()]);
    e
}

pub struct ProbeGroupModel {
    directory: Arc<dyn DirectoryAdapter>,
    cache: Arc<CacheRegistry>,
}

impl ProbeGroupModel {
    pub fn new(directory: Arc<dyn DirectoryAdapter>, cache: Arc<CacheRegistry>) -> Self {
        Self { directory, cache }
    }

    pub async fn list(&self, user: UserId) -> Result<Vec<ProbeGroup>, MasterError> {
        if let Some(hit) = self.cache.probe_group_list.get(&user.to_string()).and_then(|e| e.into_hit()) {
            return Ok(serde_json::from_value(hit).map_err(|e| MasterError::Internal(e.to_string()))?);
        }
        let entries = self
            .directory
            .search(&dn::user_base_dn(&user.to_string()), "(objectclass=amonprobegroup)", SearchScope::Subtree)
            .await?;
        let groups = entries.iter().filter_map(entry_to_probe_group).collect::<Vec<_>>();
        self.cache.probe_group_list.set_hit(user.to_string(), serde_json::to_value(&groups).unwrap());
        Ok(groups)
    }

    pub async fn get(&self, user: UserId, uuid: ProbeGroupId) -> Result<Option<ProbeGroup>, MasterError> {
        let key = dn::probe_group_dn(&uuid.to_string(), &user.to_string());
        if let Some(hit) = self.cache.probe_group_get.get(&key).and_then(|e| e.into_hit()) {
            return Ok(serde_json::from_value(hit).ok());
        }
        let entry = self.directory.get(&key).await?;
        let group = entry.as_ref().and_then(entry_to_probe_group);
        if let Some(g) = &group {
            self.cache.probe_group_get.set_hit(key, serde_json::to_value(g).unwrap());
        }
        Ok(group)
    }

    pub async fn put(&self, actor: &User, group: ProbeGroup) -> Result<ProbeGroup, MasterError> {
        group.validate_structure()?;
        if actor.uuid != group.user && !actor.is_operator {
            return Err(MasterError::InvalidArgument("only the owner or an operator may write this probe group".into()));
        }
        let dn = dn::probe_group_dn(&group.uuid.to_string(), &group.user.to_string());
        self.directory.put(&dn, probe_group_to_entry(&group)).await?;
        self.cache.invalidate_write(EntityKind::ProbeGroup, &group.user.to_string(), &dn, None);
        Ok(group)
    }

    pub async fn delete(&self, actor: &User, user: UserId, uuid: ProbeGroupId) -> Result<(), MasterError> {
        self.get(user, uuid).await?.ok_or_else(|| MasterError::NotFound(format!("probe group {uuid}")))?;
        if actor.uuid != user && !actor.is_operator {
            return Err(MasterError::InvalidArgument("only the owner or an operator may delete this probe group".into()));
        }
        let dn = dn::probe_group_dn(&uuid.to_string(), &user.to_string());
        self.directory.del(&dn).await?;
        self.cache.invalidate_write(EntityKind::ProbeGroup, &user.to_string(), &dn, None);
        Ok(())
    }
}

/// A lookup failure that is not resolvable to a clean agent id. Kept here
/// rather than in `amon-domain` because only the probe model needs it.
pub fn agent_from_str(s: &str) -> Result<AgentId, DomainError> {
    s.parse::<uuid::Uuid>()
        .map(AgentId)
        .map_err(|_| DomainError::InvalidUuid { field: "agent", value: s.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use amon_cache::RegistrySettings;
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

    fn user(uuid: Uuid, is_operator: bool) -> User {
        User { uuid: UserId(uuid), login: "u".into(), email: "u@example.com".into(), attributes: Default::default(), is_operator }
    }

    fn probe(user: UserId, agent: AgentId, machine: amon_domain::MachineId) -> Probe {
        Probe {
            uuid: ProbeId(Uuid::new_v4()),
            user,
            name: None,
            kind: "log-scan".into(),
            agent,
            machine,
            group: None,
            contacts: vec![],
            config: None,
            disabled: false,
            run_in_vm_host: false,
        }
    }

    #[tokio::test]
    async fn owner_of_their_own_vm_is_authorized() {
        let dir: Arc<dyn DirectoryAdapter> = Arc::new(InMemoryDirectory::new());
        let owner_uuid = Uuid::new_v4();
        let machine = amon_domain::MachineId(Uuid::new_v4());
        let agent = AgentId(machine.as_uuid());
        let vm_meta = Arc::new(crate::vm_metadata::InMemoryVmMetadata::new().with_vm(machine, UserId(owner_uuid)));
        let srv = Arc::new(crate::server_inventory::InMemoryServerInventory::new());

        let model = ProbeModel::new(
            dir,
            cache(),
            Arc::new(ProbeKindRegistry::with_builtins()),
            srv,
            vm_meta,
            UserId(Uuid::new_v4()),
        );
        let actor = user(owner_uuid, false);
        let p = probe(UserId(owner_uuid), agent, machine);
        assert!(model.put(&actor, p).await.is_ok());
    }

    #[tokio::test]
    async fn non_owner_non_operator_is_denied() {
        let dir: Arc<dyn DirectoryAdapter> = Arc::new(InMemoryDirectory::new());
        let owner_uuid = Uuid::new_v4();
        let machine = amon_domain::MachineId(Uuid::new_v4());
        let agent = AgentId(machine.as_uuid());
        let vm_meta = Arc::new(crate::vm_metadata::InMemoryVmMetadata::new().with_vm(machine, UserId(owner_uuid)));
        let srv = Arc::new(crate::server_inventory::InMemoryServerInventory::new());

        let model = ProbeModel::new(
            dir,
            cache(),
            Arc::new(ProbeKindRegistry::with_builtins()),
            srv,
            vm_meta,
            UserId(Uuid::new_v4()),
        );
        let actor = user(Uuid::new_v4(), false);
        let p = probe(UserId(owner_uuid), agent, machine);
        assert!(model.put(&actor, p).await.is_err());
    }

    #[tokio::test]
    async fn physical_server_requires_operator() {
        let dir: Arc<dyn DirectoryAdapter> = Arc::new(InMemoryDirectory::new());
        let owner_uuid = Uuid::new_v4();
        let machine = amon_domain::MachineId(Uuid::new_v4());
        let agent = AgentId(Uuid::new_v4());
        let srv = Arc::new(crate::server_inventory::InMemoryServerInventory::with_servers([agent]));
        let vm_meta = Arc::new(crate::vm_metadata::InMemoryVmMetadata::new());

        let model = ProbeModel::new(
            dir,
            cache(),
            Arc::new(ProbeKindRegistry::with_builtins()),
            srv,
            vm_meta,
            UserId(Uuid::new_v4()),
        );
        let non_op = user(owner_uuid, false);
        let p = probe(UserId(owner_uuid), agent, machine);
        assert!(model.put(&non_op, p.clone()).await.is_err());

        let op = user(owner_uuid, true);
        assert!(model.put(&op, p).await.is_ok());
    }

    #[tokio::test]
    async fn skip_authz_bypasses_everything_for_admin_owner() {
        let dir: Arc<dyn DirectoryAdapter> = Arc::new(InMemoryDirectory::new());
        let admin = UserId(Uuid::new_v4());
        let machine = amon_domain::MachineId(Uuid::new_v4());
        let agent = AgentId(Uuid::new_v4());
        let srv = Arc::new(crate::server_inventory::InMemoryServerInventory::new());
        let vm_meta = Arc::new(crate::vm_metadata::InMemoryVmMetadata::new());

        let model = ProbeModel::new(dir, cache(), Arc::new(ProbeKindRegistry::with_builtins()), srv, vm_meta, admin);
        let actor = user(admin.as_uuid(), false);
        let p = probe(admin, agent, machine);
        assert!(model.put(&actor, p).await.is_ok());
    }

    fn model_with_builtins() -> ProbeModel {
        let dir: Arc<dyn DirectoryAdapter> = Arc::new(InMemoryDirectory::new());
        ProbeModel::new(
            dir,
            cache(),
            Arc::new(ProbeKindRegistry::with_builtins()),
            Arc::new(crate::server_inventory::InMemoryServerInventory::new()),
            Arc::new(crate::vm_metadata::InMemoryVmMetadata::new()),
            UserId(Uuid::new_v4()),
        )
    }

    #[test]
    fn resolve_target_infers_machine_from_agent_for_run_locally() {
        let model = model_with_builtins();
        let agent = AgentId(Uuid::new_v4());
        let (a, m) = model.resolve_target("log-scan", Some(agent), None).unwrap();
        assert_eq!(a, agent);
        assert_eq!(m.as_uuid(), agent.as_uuid());
    }

    #[test]
    fn resolve_target_infers_agent_from_machine_for_run_locally() {
        let model = model_with_builtins();
        let machine = amon_domain::MachineId(Uuid::new_v4());
        let (a, m) = model.resolve_target("log-scan", None, Some(machine)).unwrap();
        assert_eq!(m, machine);
        assert_eq!(a.as_uuid(), machine.as_uuid());
    }

    #[test]
    fn resolve_target_rejects_both_missing_for_run_locally() {
        let model = model_with_builtins();
        assert!(matches!(
            model.resolve_target("log-scan", None, None),
            Err(MasterError::MissingParameter("agent"))
        ));
    }

    #[test]
    fn resolve_target_requires_both_explicit_for_run_in_vm_host() {
        let model = model_with_builtins();
        let machine = amon_domain::MachineId(Uuid::new_v4());
        assert!(matches!(
            model.resolve_target("machine-up", None, Some(machine)),
            Err(MasterError::MissingParameter("agent"))
        ));
        let agent = AgentId(Uuid::new_v4());
        assert!(model.resolve_target("machine-up", Some(agent), Some(machine)).is_ok());
    }
}
