use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DomainError;
use crate::ids::{AgentId, EventId, MachineId, ProbeId, UserId};

fn default_event_id() -> EventId {
    EventId(Uuid::new_v4())
}

fn default_version() -> u32 {
    1
}

/// `{uuid, version, user, time, machine?, probeUuid?, type, value, data?,
/// status}`, §3. Produced by agents, consumed by the Event Router.
///
/// The source validated almost nothing here (§9's "XXX"); this is the
/// strict counterpart for the fields the router actually dereferences
/// (`user`, `time`, `probeUuid`, `type`, `status`). `uuid`/`version`/
/// `value` are defaulted rather than required: agents that omit them
/// (§8 scenario 3's literal body has none of the three) still route, and
/// the router never reads `value` itself — only notification rendering
/// might, and that already tolerates `Value::Null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default = "default_event_id")]
    pub uuid: EventId,
    #[serde(default = "default_version")]
    pub version: u32,
    pub user: UserId,
    /// ms-epoch.
    pub time: i64,
    #[serde(default)]
    pub machine: Option<MachineId>,
    #[serde(default, rename = "probeUuid")]
    pub probe_uuid: Option<ProbeId>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub data: Option<Value>,
    pub status: String,
}

impl Event {
    /// Schema-level checks only — probe resolvability and maintenance are
    /// handled by the Event Router (§4.8), which needs I/O.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.kind.is_empty() {
            return Err(DomainError::InvalidEvent("type"));
        }
        if self.status.is_empty() {
            return Err(DomainError::InvalidEvent("status"));
        }
        if self.probe_uuid.is_none() {
            return Err(DomainError::InvalidEvent("probeUuid"));
        }
        if self.time < 0 {
            return Err(DomainError::InvalidEvent("time"));
        }
        if self.version == 0 {
            return Err(DomainError::InvalidEvent("version"));
        }
        Ok(())
    }

    pub fn machine_as_agent(&self) -> Option<AgentId> {
        self.machine.map(|m| AgentId(m.as_uuid()))
    }
}
