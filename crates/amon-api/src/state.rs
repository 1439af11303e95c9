use std::sync::Arc;

use amon_master::{AgentProbesService, EventRouter, MaintenanceEngine, ProbeGroupModel, ProbeModel};
use amon_store::UserResolver;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserResolver>,
    pub probes: Arc<ProbeModel>,
    pub groups: Arc<ProbeGroupModel>,
    pub maintenance: Arc<MaintenanceEngine>,
    pub events: Arc<EventRouter>,
    pub agent_probes: Arc<AgentProbesService>,
    pub api_version: Arc<str>,
}
