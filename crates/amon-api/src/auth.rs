use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

fn major(v: &str) -> Option<&str> {
    v.split('.').next()
}

/// Axum middleware enforcing the `X-Api-Version` header (§6). Unlike the
/// teacher's bearer-token check this isn't an equality test: only the
/// major version component must match what this server supports, so
/// `1.0.0` and `1.4.2` both pass against a server built for `1.2.0`.
pub async fn require_api_version(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(header) = request.headers().get("x-api-version").and_then(|v| v.to_str().ok()) else {
        return ApiError::from(amon_domain::ApiError::missing_parameter("X-Api-Version")).into_response();
    };

    match (major(header), major(state.api_version.as_ref())) {
        (Some(a), Some(b)) if a == b => next.run(request).await,
        _ => {
            ApiError::from(amon_domain::ApiError::invalid_argument(format!("unsupported api version '{header}'")))
                .into_response()
        }
    }
}
