pub mod error;
pub mod plugin;
pub mod plugins;
pub mod registry;

use std::sync::Arc;

pub use error::NotifyError;
pub use plugin::NotificationPlugin;
pub use plugins::{EmailPlugin, SmsPlugin, WebhookPlugin};
pub use registry::NotificationRegistry;

/// One entry of the `notification_plugins` bootstrap config list (§6).
#[derive(Debug, Clone)]
pub struct PluginSpec {
    pub name: String,
    pub kind: String,
    pub config: serde_json::Value,
}

/// Build the plugins named in the bootstrap config into concrete
/// [`NotificationPlugin`] instances. `kind` selects the implementation;
/// per-plugin `config` supplies its transport details.
pub fn build_plugin(spec: &PluginSpec) -> Result<Arc<dyn NotificationPlugin>, NotifyError> {
    match spec.kind.as_str() {
        "email" => {
            let relay = spec
                .config
                .get("smtp_relay")
                .and_then(|v| v.as_str())
                .unwrap_or("http://localhost:2500/send")
                .to_string();
            Ok(Arc::new(EmailPlugin::new(spec.name.clone(), relay)))
        }
        "sms" => {
            let gateway = spec
                .config
                .get("gateway_url")
                .and_then(|v| v.as_str())
                .unwrap_or("http://localhost:2501/send")
                .to_string();
            Ok(Arc::new(SmsPlugin::new(spec.name.clone(), gateway)))
        }
        "webhook" => Ok(Arc::new(WebhookPlugin::new(spec.name.clone()))),
        other => Err(NotifyError::UnknownKind(other.to_string())),
    }
}
