//! §9 "Dynamic dispatch on probe type": the source keys a registry by
//! string. Re-expressed as a capability interface, variants are the
//! concrete probe kinds, grounded on `DriverRegistry`'s
//! `HashMap<key, Arc<dyn Trait>>` / `register`/`for_key` shape.

use std::collections::HashMap;
use std::sync::Arc;

use amon_domain::DomainError;
use serde_json::Value;

/// `{validateConfig, runLocally?, runInVmHost?}`, §9. Probe *execution* is
/// explicitly out of scope (§1) — only the shape the master needs to
/// validate and authorize a probe definition lives here.
pub trait ProbeKind: Send + Sync + 'static {
    fn validate_config(&self, config: Option<&Value>) -> Result<(), DomainError>;

    /// `true` for kinds where `agent` and `machine` must name the same
    /// host (§3).
    fn run_locally(&self) -> bool;

    /// `true` for kinds where `agent` is the physical host of the VM
    /// named by `machine` (§3).
    fn run_in_vm_host(&self) -> bool {
        !self.run_locally()
    }
}

/// A probe kind whose config is an arbitrary JSON object — enough for the
/// builtins below, none of which define a stricter schema.
struct ObjectConfigKind {
    run_locally: bool,
}

impl ProbeKind for ObjectConfigKind {
    fn validate_config(&self, config: Option<&Value>) -> Result<(), DomainError> {
        match config {
            None => Ok(()),
            Some(Value::Object(_)) => Ok(()),
            Some(other) => Err(DomainError::InvalidConfig(format!("expected an object, got {other}"))),
        }
    }

    fn run_locally(&self) -> bool {
        self.run_locally
    }
}

/// Registry keyed by kind name (§3: "`type` selects a known probe kind;
/// unknown types are rejected"), populated at startup.
pub struct ProbeKindRegistry {
    kinds: HashMap<&'static str, Arc<dyn ProbeKind>>,
}

impl ProbeKindRegistry {
    pub fn new() -> Self {
        Self { kinds: HashMap::new() }
    }

    /// The four probe kinds the fleet ships with out of the box:
    /// `log-scan`, `icmp`, `process` run on the agent's own machine;
    /// `machine-up` runs on the VM's physical host.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register("log-scan", Arc::new(ObjectConfigKind { run_locally: true }));
        reg.register("icmp", Arc::new(ObjectConfigKind { run_locally: true }));
        reg.register("process", Arc::new(ObjectConfigKind { run_locally: true }));
        reg.register("machine-up", Arc::new(ObjectConfigKind { run_locally: false }));
        reg
    }

    pub fn register(&mut self, name: &'static str, kind: Arc<dyn ProbeKind>) -> &mut Self {
        self.kinds.insert(name, kind);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ProbeKind>, DomainError> {
        self.kinds.get(name).cloned().ok_or_else(|| DomainError::UnknownProbeType(name.to_string()))
    }
}

impl Default for ProbeKindRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_rejected() {
        let reg = ProbeKindRegistry::with_builtins();
        assert!(matches!(reg.get("nonexistent"), Err(DomainError::UnknownProbeType(_))));
    }

    #[test]
    fn run_in_vm_host_kind_is_not_run_locally() {
        let reg = ProbeKindRegistry::with_builtins();
        let k = reg.get("machine-up").unwrap();
        assert!(!k.run_locally());
        assert!(k.run_in_vm_host());
    }

    #[test]
    fn object_config_rejects_non_object() {
        let reg = ProbeKindRegistry::with_builtins();
        let k = reg.get("log-scan").unwrap();
        assert!(k.validate_config(Some(&Value::String("x".into()))).is_err());
        assert!(k.validate_config(Some(&serde_json::json!({"path": "/var/log"}))).is_ok());
    }
}
