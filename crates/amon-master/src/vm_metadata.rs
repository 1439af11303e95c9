use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use amon_domain::{MachineId, UserId};

use crate::error::MasterError;

/// What the master needs to know about a VM to authorize a probe write
/// (§4.5 rules 3-4): whether it exists at all, and who owns it.
#[derive(Debug, Clone, Copy)]
pub struct VmInfo {
    pub owner: UserId,
}

/// §4.5: "VM existence/ownership is an external VM metadata lookup."
/// `Ok(None)` is the clean "no such VM" answer; anything else is a fatal
/// internal error, never an authorization denial.
#[async_trait]
pub trait VmMetadata: Send + Sync + 'static {
    async fn lookup_vm(&self, machine: MachineId) -> Result<Option<VmInfo>, MasterError>;
}

#[derive(Default)]
pub struct InMemoryVmMetadata {
    vms: RwLock<HashMap<MachineId, VmInfo>>,
}

impl InMemoryVmMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vm(self, machine: MachineId, owner: UserId) -> Self {
        self.vms.write().unwrap().insert(machine, VmInfo { owner });
        self
    }
}

#[async_trait]
impl VmMetadata for InMemoryVmMetadata {
    async fn lookup_vm(&self, machine: MachineId) -> Result<Option<VmInfo>, MasterError> {
        Ok(self.vms.read().unwrap().get(&machine).copied())
    }
}

/// Talks to the real VM metadata service over its HTTP API, grounded on
/// the teacher's `reqwest`-based cloud API clients.
pub struct HttpVmMetadata {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVmMetadata {
    pub fn new(base_url: String) -> Self {
        Self { client: reqwest::Client::new(), base_url }
    }
}

#[derive(serde::Deserialize)]
struct VmMetadataResponse {
    owner_uuid: uuid::Uuid,
}

#[async_trait]
impl VmMetadata for HttpVmMetadata {
    async fn lookup_vm(&self, machine: MachineId) -> Result<Option<VmInfo>, MasterError> {
        let url = format!("{}/vms/{}", self.base_url, machine);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MasterError::Internal(format!("vm metadata lookup {machine}: {e}")))?;
        match resp.status() {
            s if s.is_success() => {
                let body: VmMetadataResponse = resp
                    .json()
                    .await
                    .map_err(|e| MasterError::Internal(format!("vm metadata response for {machine}: {e}")))?;
                Ok(Some(VmInfo { owner: UserId(body.owner_uuid) }))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            s => Err(MasterError::Internal(format!("vm metadata returned {s} for {machine}"))),
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
    async fn stub_reports_ownership() {
        let machine = MachineId(Uuid::new_v4());
        let owner = UserId(Uuid::new_v4());
        let meta = InMemoryVmMetadata::new().with_vm(machine, owner);
        let info = meta.lookup_vm(machine).await.unwrap().unwrap();
        assert_eq!(info.owner, owner);
        assert!(meta.lookup_vm(MachineId(Uuid::new_v4())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn http_lookup_parses_owner_on_success() {
        let server = MockServer::start().await;
        let machine = MachineId(Uuid::new_v4());
        let owner = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path(format!("/vms/{machine}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "owner_uuid": owner })))
            .mount(&server)
            .await;

        let meta = HttpVmMetadata::new(server.uri());
        let info = meta.lookup_vm(machine).await.unwrap().unwrap();
        assert_eq!(info.owner, UserId(owner));
    }

    #[tokio::test]
    async fn http_lookup_not_found_is_none() {
        let server = MockServer::start().await;
        let machine = MachineId(Uuid::new_v4());
        Mock::given(method("GET"))
            .and(path(format!("/vms/{machine}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let meta = HttpVmMetadata::new(server.uri());
        assert!(meta.lookup_vm(machine).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn http_lookup_server_error_is_internal() {
        let server = MockServer::start().await;
        let machine = MachineId(Uuid::new_v4());
        Mock::given(method("GET"))
            .and(path(format!("/vms/{machine}")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let meta = HttpVmMetadata::new(server.uri());
        assert!(matches!(meta.lookup_vm(machine).await, Err(MasterError::Internal(_))));
    }
}
