use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::NotifyError;
use crate::plugin::NotificationPlugin;

/// Delivers to an SMTP-relay-fronting HTTP gateway. The relay itself is
/// out of scope (§1's "notification transports... each is a plugin
/// behind a fixed interface"); this plugin is the fixed interface's real
/// implementation, reached over HTTP like the teacher's cloud API calls.
pub struct EmailPlugin {
    name: String,
    client: reqwest::Client,
    smtp_relay: String,
}

impl EmailPlugin {
    pub fn new(name: impl Into<String>, smtp_relay: String) -> Self {
        Self { name: name.into(), client: reqwest::Client::new(), smtp_relay }
    }
}

#[async_trait]
impl NotificationPlugin for EmailPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_medium(&self, attr_name: &str) -> bool {
        attr_name == "email"
    }

    async fn notify(&self, probe_name: &str, address: &str, message: &str) -> Result<(), NotifyError> {
        debug!(plugin = %self.name, %address, "sending email notification");
        let resp = self
            .client
            .post(&self.smtp_relay)
            .json(&json!({ "to": address, "subject": probe_name, "body": message }))
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed { plugin: self.name.clone(), message: e.to_string() })?;
        if !resp.status().is_success() {
            return Err(NotifyError::DeliveryFailed {
                plugin: self.name.clone(),
                message: format!("relay returned {}", resp.status()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn delivers_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

        let plugin = EmailPlugin::new("email", server.uri());
        plugin.notify("disk-full", "ops@example.com", "disk at 95%").await.unwrap();
    }

    #[tokio::test]
    async fn relay_failure_is_delivery_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let plugin = EmailPlugin::new("email", server.uri());
        let err = plugin.notify("disk-full", "ops@example.com", "disk at 95%").await.unwrap_err();
        assert!(matches!(err, NotifyError::DeliveryFailed { plugin, .. } if plugin == "email"));
    }
}
