use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_api_version;
use crate::handlers;
use crate::state::AppState;

/// Builds the full `Router`, grounded on the teacher's
/// `build_app`: routes, then the version-check middleware applied via
/// `route_layer` (so it runs after routing but before every handler),
/// then tracing, then state.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/pub/:user", get(handlers::profile))
        .route("/pub/:user/probes", get(handlers::list_probes).post(handlers::create_probe))
        .route(
            "/pub/:user/probes/:uuid",
            get(handlers::get_probe).put(handlers::put_probe).delete(handlers::delete_probe),
        )
        .route(
            "/pub/:user/probegroups",
            get(handlers::list_probe_groups).post(handlers::create_probe_group),
        )
        .route(
            "/pub/:user/probegroups/:uuid",
            get(handlers::get_probe_group).put(handlers::put_probe_group).delete(handlers::delete_probe_group),
        )
        .route(
            "/pub/:user/maintenances",
            get(handlers::list_maintenances).post(handlers::create_maintenance),
        )
        .route(
            "/pub/:user/maintenances/:id",
            get(handlers::get_maintenance).delete(handlers::delete_maintenance),
        )
        .route("/maintenances", get(handlers::list_all_maintenances))
        .route(
            "/agentprobes",
            get(handlers::get_agent_probes).head(handlers::head_agent_probes),
        )
        .route("/events", post(handlers::post_events))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
