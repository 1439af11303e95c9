pub mod agent_probes;
pub mod contacts;
pub mod error;
pub mod events;
pub mod maintenance;
pub mod probe_kinds;
pub mod probes;
pub mod server_inventory;
pub mod vm_metadata;

pub use agent_probes::AgentProbesService;
pub use error::MasterError;
pub use events::EventRouter;
pub use maintenance::MaintenanceEngine;
pub use probe_kinds::{ProbeKind, ProbeKindRegistry};
pub use probes::{ProbeGroupModel, ProbeModel};
pub use server_inventory::{HttpServerInventory, InMemoryServerInventory, ServerInventory};
pub use vm_metadata::{HttpVmMetadata, InMemoryVmMetadata, VmInfo, VmMetadata};
