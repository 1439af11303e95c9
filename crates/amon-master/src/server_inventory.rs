use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use amon_domain::AgentId;

use crate::error::MasterError;

/// §4.5: "Physical-server existence is an external lookup (server
/// inventory)." Out of scope per §1 ("operational packaging"); this is
/// the documented collaborator interface the core consumes.
///
/// `Ok(false)` is the clean "not a physical server" answer authorization
/// falls through on; any other failure must be surfaced as
/// [`MasterError::Internal`], never treated as a denial (§4.5).
#[async_trait]
pub trait ServerInventory: Send + Sync + 'static {
    async fn server_exists(&self, agent: AgentId) -> Result<bool, MasterError>;
}

/// In-memory stub for tests and local/dev bootstrapping.
#[derive(Default)]
pub struct InMemoryServerInventory {
    servers: RwLock<HashSet<AgentId>>,
}

impl InMemoryServerInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_servers(servers: impl IntoIterator<Item = AgentId>) -> Self {
        Self { servers: RwLock::new(servers.into_iter().collect()) }
    }

    pub fn add(&self, agent: AgentId) {
        self.servers.write().unwrap().insert(agent);
    }
}

#[async_trait]
impl ServerInventory for InMemoryServerInventory {
    async fn server_exists(&self, agent: AgentId) -> Result<bool, MasterError> {
        Ok(self.servers.read().unwrap().contains(&agent))
    }
}

/// Talks to the real server-inventory service over its HTTP API, grounded
/// on the teacher's `reqwest`-based cloud API clients (`nclav-driver::gcp`).
pub struct HttpServerInventory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpServerInventory {
    pub fn new(base_url: String) -> Self {
        Self { client: reqwest::Client::new(), base_url }
    }
}

#[async_trait]
impl ServerInventory for HttpServerInventory {
    async fn server_exists(&self, agent: AgentId) -> Result<bool, MasterError> {
        let url = format!("{}/servers/{}", self.base_url, agent);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MasterError::Internal(format!("server inventory lookup {agent}: {e}")))?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => Err(MasterError::Internal(format!("server inventory returned {s} for {agent}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn stub_reports_registered_servers() {
        let agent = AgentId(Uuid::new_v4());
        let inv = InMemoryServerInventory::with_servers([agent]);
        assert!(inv.server_exists(agent).await.unwrap());
        assert!(!inv.server_exists(AgentId(Uuid::new_v4())).await.unwrap());
    }

    #[tokio::test]
    async fn http_inventory_found_is_true() {
        let server = MockServer::start().await;
        let agent = AgentId(Uuid::new_v4());
        Mock::given(method("GET"))
            .and(path(format!("/servers/{agent}")))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let inv = HttpServerInventory::new(server.uri());
        assert!(inv.server_exists(agent).await.unwrap());
    }

    #[tokio::test]
    async fn http_inventory_not_found_is_false() {
        let server = MockServer::start().await;
        let agent = AgentId(Uuid::new_v4());
        Mock::given(method("GET"))
            .and(path(format!("/servers/{agent}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let inv = HttpServerInventory::new(server.uri());
        assert!(!inv.server_exists(agent).await.unwrap());
    }

    #[tokio::test]
    async fn http_inventory_server_error_is_internal() {
        let server = MockServer::start().await;
        let agent = AgentId(Uuid::new_v4());
        Mock::given(method("GET"))
            .and(path(format!("/servers/{agent}")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let inv = HttpServerInventory::new(server.uri());
        assert!(matches!(inv.server_exists(agent).await, Err(MasterError::Internal(_))));
    }
}
