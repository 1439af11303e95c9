use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::NotifyError;
use crate::plugin::NotificationPlugin;

/// Delivers by POSTing to the contact's address directly — the address
/// attribute value *is* the target URL.
pub struct WebhookPlugin {
    name: String,
    client: reqwest::Client,
}

impl WebhookPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl NotificationPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_medium(&self, attr_name: &str) -> bool {
        attr_name == "webhook"
    }

    async fn notify(&self, probe_name: &str, address: &str, message: &str) -> Result<(), NotifyError> {
        debug!(plugin = %self.name, url = %address, "posting webhook notification");
        let resp = self
            .client
            .post(address)
            .json(&json!({ "probe": probe_name, "message": message }))
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed { plugin: self.name.clone(), message: e.to_string() })?;
        if !resp.status().is_success() {
            return Err(NotifyError::DeliveryFailed {
                plugin: self.name.clone(),
                message: format!("webhook endpoint returned {}", resp.status()),
            });
        }
        Ok(())
    }
}
