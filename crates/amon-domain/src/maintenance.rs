use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{MachineId, MaintenanceId, ProbeGroupId, ProbeId, UserId};

/// Exactly one of {all, probes, probeGroups, machines}, §3.
///
/// The wire shape is flattened — `scope` fields live as siblings of
/// `id`/`start`/`end` on the JSON object rather than as a nested tagged
/// union — so (de)serialization goes through [`RawScope`] rather than
/// serde's built-in enum representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceScope {
    All,
    Probes(Vec<ProbeId>),
    ProbeGroups(Vec<ProbeGroupId>),
    Machines(Vec<MachineId>),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    probes: Option<Vec<ProbeId>>,
    #[serde(rename = "probeGroups", default, skip_serializing_if = "Option::is_none")]
    probe_groups: Option<Vec<ProbeGroupId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    machines: Option<Vec<MachineId>>,
}

impl MaintenanceScope {
    pub fn from_raw(raw: RawScope) -> Result<Self, DomainError> {
        let present = [
            raw.all.unwrap_or(false),
            raw.probes.is_some(),
            raw.probe_groups.is_some(),
            raw.machines.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count();
        if present != 1 {
            return Err(DomainError::MaintenanceScope(present));
        }
        Ok(if raw.all.unwrap_or(false) {
            MaintenanceScope::All
        } else if let Some(p) = raw.probes {
            MaintenanceScope::Probes(p)
        } else if let Some(g) = raw.probe_groups {
            MaintenanceScope::ProbeGroups(g)
        } else {
            MaintenanceScope::Machines(raw.machines.unwrap())
        })
    }

    fn to_raw(&self) -> RawScope {
        match self {
            MaintenanceScope::All => RawScope { all: Some(true), ..Default::default() },
            MaintenanceScope::Probes(p) => RawScope { probes: Some(p.clone()), ..Default::default() },
            MaintenanceScope::ProbeGroups(g) => {
                RawScope { probe_groups: Some(g.clone()), ..Default::default() }
            }
            MaintenanceScope::Machines(m) => RawScope { machines: Some(m.clone()), ..Default::default() },
        }
    }

    pub fn matches(&self, probe: Option<ProbeId>, group: Option<ProbeGroupId>, machine: Option<MachineId>) -> bool {
        match self {
            MaintenanceScope::All => true,
            MaintenanceScope::Probes(ids) => probe.is_some_and(|p| ids.contains(&p)),
            MaintenanceScope::ProbeGroups(ids) => group.is_some_and(|g| ids.contains(&g)),
            MaintenanceScope::Machines(ids) => machine.is_some_and(|m| ids.contains(&m)),
        }
    }
}

impl Serialize for MaintenanceScope {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(s)
    }
}

impl<'de> Deserialize<'de> for MaintenanceScope {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = RawScope::deserialize(d)?;
        MaintenanceScope::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

/// `{id, user, start, end, notes?, scope}`, §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: MaintenanceId,
    pub user: UserId,
    /// ms-epoch.
    pub start: i64,
    /// ms-epoch, exclusive upper bound (`[start, end)`).
    pub end: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub scope: MaintenanceScope,
}

impl MaintenanceWindow {
    pub fn validate_range(&self) -> Result<(), DomainError> {
        if self.start >= self.end {
            return Err(DomainError::MaintenanceRange { start: self.start, end: self.end });
        }
        Ok(())
    }

    /// `start < t < end` per §4.7's `isEventInMaintenance`.
    pub fn covers_time(&self, t: i64) -> bool {
        self.start < t && t < self.end
    }
}

/// Resolve `start`/`end` literals from the create-request wire shapes in §3:
/// `start = "now"` resolves to `now_ms`; `"Nm"|"Nh"|"Nd"` resolves to
/// `now_ms + N * unit`. A bare integer is taken as an absolute ms-epoch.
pub fn resolve_time_literal(literal: &str, now_ms: i64) -> Result<i64, DomainError> {
    if literal == "now" {
        return Ok(now_ms);
    }
    if let Ok(abs) = literal.parse::<i64>() {
        return Ok(abs);
    }
    parse_relative_duration(literal, now_ms)
}

/// `"Nm"|"Nh"|"Nd"` for `N` in `[1, 10^6]` (§8 boundary behavior).
pub fn parse_relative_duration(literal: &str, now_ms: i64) -> Result<i64, DomainError> {
    let (num, unit_ms) = if let Some(n) = literal.strip_suffix('m') {
        (n, 60_000i64)
    } else if let Some(n) = literal.strip_suffix('h') {
        (n, 3_600_000i64)
    } else if let Some(n) = literal.strip_suffix('d') {
        (n, 86_400_000i64)
    } else {
        return Err(DomainError::InvalidDuration(literal.to_string()));
    };
    let n: i64 = num
        .parse()
        .map_err(|_| DomainError::InvalidDuration(literal.to_string()))?;
    if !(1..=1_000_000).contains(&n) {
        return Err(DomainError::InvalidDuration(literal.to_string()));
    }
    Ok(now_ms + n * unit_ms)
}
