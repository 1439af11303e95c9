use std::collections::HashMap;

use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the `:user` path segment (UUID or login, §4.4) into its
/// directory record before the handler body runs; a 404 here means the
/// handler never executes, per §4.10's request pre-processing.
pub struct ResolvedUser(pub amon_domain::User);

#[async_trait]
impl FromRequestParts<AppState> for ResolvedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::from(amon_domain::ApiError::missing_parameter(e.to_string())))?;
        let key = params
            .get("user")
            .ok_or_else(|| ApiError::from(amon_domain::ApiError::missing_parameter("user")))?;
        let user = state
            .users
            .resolve(key)
            .await?
            .ok_or_else(|| ApiError::from(amon_domain::ApiError::not_found(format!("user '{key}' not found"))))?;
        Ok(ResolvedUser(user))
    }
}
