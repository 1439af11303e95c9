use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;
use crate::ids::{AgentId, MachineId, ProbeGroupId, ProbeId, UserId};

pub const MAX_NAME_LEN: usize = 512;

/// `{uuid, user, name?, type, agent, machine, group?, contacts[], config?,
/// disabled, runInVmHost?}`, §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    pub uuid: ProbeId,
    pub user: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub agent: AgentId,
    pub machine: MachineId,
    #[serde(default)]
    pub group: Option<ProbeGroupId>,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub disabled: bool,
    /// Set (internal serialization only, §4.5) when `agent` is the physical
    /// host of the VM named by `machine`, i.e. a `runInVmHost` probe.
    #[serde(default, rename = "runInVmHost")]
    pub run_in_vm_host: bool,
}

impl Probe {
    /// Structural checks from §3/§4.5 that do not require any I/O:
    /// name length and the runLocally agent==machine rule. Probe-kind
    /// existence and config validation happen via `ProbeKindRegistry`,
    /// and authorization is a separate step (§4.5).
    pub fn validate_structure(&self, run_locally: bool) -> Result<(), DomainError> {
        if let Some(name) = &self.name {
            if name.chars().count() > MAX_NAME_LEN {
                return Err(DomainError::NameTooLong(name.chars().count()));
            }
        }
        if run_locally && self.agent != self.machine_as_agent() {
            return Err(DomainError::RunLocallyMismatch);
        }
        Ok(())
    }

    fn machine_as_agent(&self) -> AgentId {
        AgentId(self.machine.as_uuid())
    }

    /// Public serialization for the `/pub` API (§4.5): omits `runInVmHost`,
    /// which is only meaningful to relays/agents.
    pub fn to_public_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uuid": self.uuid,
            "user": self.user,
            "name": self.name,
            "type": self.kind,
            "agent": self.agent,
            "machine": self.machine,
            "group": self.group,
            "contacts": self.contacts,
            "config": self.config,
            "disabled": self.disabled,
        })
    }

    /// Internal serialization for relays/agents (§4.5): adds `runInVmHost`.
    pub fn to_internal_json(&self) -> serde_json::Value {
        let mut v = self.to_public_json();
        v["runInVmHost"] = serde_json::json!(self.run_in_vm_host);
        v
    }
}

/// `{uuid, user, name, contacts[], disabled}`, §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeGroup {
    pub uuid: ProbeGroupId,
    pub user: UserId,
    pub name: String,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

impl ProbeGroup {
    pub fn validate_structure(&self) -> Result<(), DomainError> {
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::NameTooLong(self.name.chars().count()));
        }
        Ok(())
    }

    pub fn to_public_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uuid": self.uuid,
            "user": self.user,
            "name": self.name,
            "contacts": self.contacts,
            "disabled": self.disabled,
        })
    }
}
