use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use amon_domain::{AgentId, Event, MachineId, MaintenanceId, MaintenanceScope, Probe, ProbeGroup, ProbeGroupId, ProbeId, UserId};

use crate::error::ApiError;
use crate::extract::ResolvedUser;
use crate::state::AppState;

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as i64
}

// ── Ping / profile ───────────────────────────────────────────────────────

pub async fn ping() -> Json<Value> {
    Json(json!({ "ping": "pong" }))
}

pub async fn profile(ResolvedUser(user): ResolvedUser) -> Json<Value> {
    Json(json!({
        "uuid": user.uuid,
        "login": user.login,
        "email": user.email,
        "isOperator": user.is_operator,
    }))
}

// ── Probes ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProbeBody {
    #[serde(default)]
    pub uuid: Option<ProbeId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub agent: Option<AgentId>,
    #[serde(default)]
    pub machine: Option<MachineId>,
    #[serde(default)]
    pub group: Option<ProbeGroupId>,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub disabled: bool,
}

/// `agent`/`machine` are resolved by [`ProbeModel::resolve_target`]: for
/// runLocally kinds either may be omitted and is inferred from the other
/// (§3); other kinds require both explicitly.
fn probe_from_body(state: &AppState, user: UserId, uuid: ProbeId, body: ProbeBody) -> Result<Probe, ApiError> {
    let kind = body.kind.ok_or_else(|| ApiError::from(amon_domain::ApiError::missing_parameter("type")))?;
    let (agent, machine) = state.probes.resolve_target(&kind, body.agent, body.machine)?;
    Ok(Probe {
        uuid,
        user,
        name: body.name,
        kind,
        agent,
        machine,
        group: body.group,
        contacts: body.contacts,
        config: body.config,
        disabled: body.disabled,
        run_in_vm_host: false,
    })
}

pub async fn list_probes(State(state): State<AppState>, ResolvedUser(user): ResolvedUser) -> Result<Json<Value>, ApiError> {
    let probes = state.probes.list(user.uuid).await?;
    Ok(Json(json!(probes.iter().map(Probe::to_public_json).collect::<Vec<_>>())))
}

pub async fn create_probe(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Json(body): Json<ProbeBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let uuid = body.uuid.unwrap_or_else(|| ProbeId(Uuid::new_v4()));
    let probe = probe_from_body(&state, user.uuid, uuid, body)?;
    let saved = state.probes.put(&user, probe).await?;
    Ok((StatusCode::CREATED, Json(saved.to_public_json())))
}

pub async fn get_probe(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Path((_, uuid)): Path<(String, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let probe = state
        .probes
        .get(user.uuid, ProbeId(uuid))
        .await?
        .ok_or_else(|| ApiError::from(amon_domain::ApiError::not_found(format!("probe {uuid}"))))?;
    Ok(Json(probe.to_public_json()))
}

pub async fn put_probe(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Path((_, uuid)): Path<(String, Uuid)>,
    Json(body): Json<ProbeBody>,
) -> Result<Json<Value>, ApiError> {
    let probe = probe_from_body(&state, user.uuid, ProbeId(uuid), body)?;
    let saved = state.probes.put(&user, probe).await?;
    Ok(Json(saved.to_public_json()))
}

pub async fn delete_probe(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Path((_, uuid)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.probes.delete(&user, user.uuid, ProbeId(uuid)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Probe groups ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProbeGroupBody {
    #[serde(default)]
    pub uuid: Option<ProbeGroupId>,
    pub name: Option<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

fn group_from_body(user: UserId, uuid: ProbeGroupId, body: ProbeGroupBody) -> Result<ProbeGroup, ApiError> {
    let name = body.name.ok_or_else(|| ApiError::from(amon_domain::ApiError::missing_parameter("name")))?;
    Ok(ProbeGroup { uuid, user, name, contacts: body.contacts, disabled: body.disabled })
}

pub async fn list_probe_groups(State(state): State<AppState>, ResolvedUser(user): ResolvedUser) -> Result<Json<Value>, ApiError> {
    let groups = state.groups.list(user.uuid).await?;
    Ok(Json(json!(groups.iter().map(ProbeGroup::to_public_json).collect::<Vec<_>>())))
}

pub async fn create_probe_group(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Json(body): Json<ProbeGroupBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let uuid = body.uuid.unwrap_or_else(|| ProbeGroupId(Uuid::new_v4()));
    let group = group_from_body(user.uuid, uuid, body)?;
    let saved = state.groups.put(&user, group).await?;
    Ok((StatusCode::CREATED, Json(saved.to_public_json())))
}

pub async fn get_probe_group(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Path((_, uuid)): Path<(String, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let group = state
        .groups
        .get(user.uuid, ProbeGroupId(uuid))
        .await?
        .ok_or_else(|| ApiError::from(amon_domain::ApiError::not_found(format!("probe group {uuid}"))))?;
    Ok(Json(group.to_public_json()))
}

pub async fn put_probe_group(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Path((_, uuid)): Path<(String, Uuid)>,
    Json(body): Json<ProbeGroupBody>,
) -> Result<Json<Value>, ApiError> {
    let group = group_from_body(user.uuid, ProbeGroupId(uuid), body)?;
    let saved = state.groups.put(&user, group).await?;
    Ok(Json(saved.to_public_json()))
}

pub async fn delete_probe_group(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Path((_, uuid)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.groups.delete(&user, user.uuid, ProbeGroupId(uuid)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Maintenance windows ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateMaintenanceBody {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub scope: MaintenanceScope,
}

pub async fn list_maintenances(State(state): State<AppState>, ResolvedUser(user): ResolvedUser) -> Result<Json<Value>, ApiError> {
    let windows = state.maintenance.list(user.uuid).await?;
    Ok(Json(json!(windows)))
}

pub async fn create_maintenance(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Json(body): Json<CreateMaintenanceBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let now = now_ms();
    let start = amon_domain::resolve_time_literal(&body.start, now)?;
    let end = amon_domain::resolve_time_literal(&body.end, now)?;
    let window = state.maintenance.create(user.uuid, start, end, body.notes, body.scope).await?;
    Ok((StatusCode::CREATED, Json(json!(window))))
}

pub async fn get_maintenance(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Path((_, id)): Path<(String, u64)>,
) -> Result<Json<Value>, ApiError> {
    let window = state.maintenance.get(user.uuid, MaintenanceId(id)).await?;
    Ok(Json(json!(window)))
}

pub async fn delete_maintenance(
    State(state): State<AppState>,
    ResolvedUser(user): ResolvedUser,
    Path((_, id)): Path<(String, u64)>,
) -> Result<StatusCode, ApiError> {
    state.maintenance.delete(user.uuid, MaintenanceId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /maintenances`: operator-only cross-user listing. The wire
/// protocol carries no separate identity channel beyond the path user
/// elsewhere, so the caller names itself via `?actor=`; its directory
/// record must carry the operator flag (§3).
#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub actor: String,
}

pub async fn list_all_maintenances(State(state): State<AppState>, Query(q): Query<ActorQuery>) -> Result<Json<Value>, ApiError> {
    let actor = state
        .users
        .resolve(&q.actor)
        .await?
        .ok_or_else(|| ApiError::from(amon_domain::ApiError::not_found(format!("user '{}' not found", q.actor))))?;
    if !actor.is_operator {
        return Err(ApiError::from(amon_domain::ApiError::invalid_argument("operator privilege required")));
    }
    let windows = state.maintenance.list_all().await?;
    Ok(Json(json!(windows)))
}

// ── Agent probes ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AgentQuery {
    pub agent: Uuid,
}

pub async fn get_agent_probes(State(state): State<AppState>, Query(q): Query<AgentQuery>) -> Result<Response, ApiError> {
    let (digest, manifest) = state.agent_probes.manifest(AgentId(q.agent)).await?;
    Ok(([("x-digest", digest)], Json(manifest)).into_response())
}

pub async fn head_agent_probes(State(state): State<AppState>, Query(q): Query<AgentQuery>) -> Result<Response, ApiError> {
    let digest = state.agent_probes.digest(AgentId(q.agent)).await?;
    Ok(([("x-digest", digest)], StatusCode::OK).into_response())
}

// ── Events ───────────────────────────────────────────────────────────────

pub async fn post_events(State(state): State<AppState>, Json(body): Json<Value>) -> Result<StatusCode, ApiError> {
    let events: Vec<Event> = match body {
        Value::Array(_) => serde_json::from_value(body)
            .map_err(|e| ApiError::from(amon_domain::ApiError::invalid_argument(e.to_string())))?,
        single => vec![serde_json::from_value(single)
            .map_err(|e| ApiError::from(amon_domain::ApiError::invalid_argument(e.to_string())))?],
    };
    state.events.route(events).await?;
    Ok(StatusCode::ACCEPTED)
}
