use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::NotifyError;
use crate::plugin::NotificationPlugin;

/// Delivers to an SMS gateway's HTTP API.
pub struct SmsPlugin {
    name: String,
    client: reqwest::Client,
    gateway_url: String,
}

impl SmsPlugin {
    pub fn new(name: impl Into<String>, gateway_url: String) -> Self {
        Self { name: name.into(), client: reqwest::Client::new(), gateway_url }
    }
}

#[async_trait]
impl NotificationPlugin for SmsPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_medium(&self, attr_name: &str) -> bool {
        attr_name == "sms"
    }

    async fn notify(&self, _probe_name: &str, address: &str, message: &str) -> Result<(), NotifyError> {
        debug!(plugin = %self.name, %address, "sending sms notification");
        let resp = self
            .client
            .post(&self.gateway_url)
            .json(&json!({ "to": address, "body": message }))
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed { plugin: self.name.clone(), message: e.to_string() })?;
        if !resp.status().is_success() {
            return Err(NotifyError::DeliveryFailed {
                plugin: self.name.clone(),
                message: format!("gateway returned {}", resp.status()),
            });
        }
        Ok(())
    }
}
