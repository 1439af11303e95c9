use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use amon_master::MasterError;

/// Wire-level `{code, message}` body, §6/§7. Wraps [`amon_domain::ApiError`]
/// so `IntoResponse` can be implemented here without violating the orphan
/// rule, mirroring the teacher's local `ApiError` + `From<...>` shape
/// (`nclav-api::error::ApiError`).
pub struct ApiError(amon_domain::ApiError);

impl From<amon_domain::ApiError> for ApiError {
    fn from(e: amon_domain::ApiError) -> Self {
        ApiError(e)
    }
}

impl From<MasterError> for ApiError {
    fn from(e: MasterError) -> Self {
        ApiError(e.into())
    }
}

impl From<amon_store::StoreError> for ApiError {
    fn from(e: amon_store::StoreError) -> Self {
        ApiError(amon_domain::ApiError::internal(e.to_string()))
    }
}

impl From<amon_domain::DomainError> for ApiError {
    fn from(e: amon_domain::DomainError) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({ "code": self.0.kind.code(), "message": self.0.message }));
        (status, body).into_response()
    }
}
