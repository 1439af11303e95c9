pub mod error;
pub mod event;
pub mod ids;
pub mod maintenance;
pub mod probe;
pub mod user;

pub use error::{ApiError, ApiErrorKind, DomainError};
pub use event::Event;
pub use ids::{AgentId, EventId, MachineId, MaintenanceId, ProbeGroupId, ProbeId, UserId};
pub use maintenance::{parse_relative_duration, resolve_time_literal, MaintenanceScope, MaintenanceWindow};
pub use probe::{Probe, ProbeGroup};
pub use user::User;
