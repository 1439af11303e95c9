use async_trait::async_trait;

use crate::error::NotifyError;

/// §4.6/§9 "Dynamic dispatch on notification medium": plugins implement
/// `{acceptsMedium(name) -> bool, notify(probeName, address, message) ->
/// error}`. The registry iterates registered plugins until one accepts.
#[async_trait]
pub trait NotificationPlugin: Send + Sync + 'static {
    /// Stable identifier used in logs and config (`name:` in the plugin
    /// registry, §6).
    fn name(&self) -> &str;

    /// Whether this plugin delivers to the contact-URN attribute named
    /// `attr_name` (e.g. `"email"`, `"sms"`).
    fn accepts_medium(&self, attr_name: &str) -> bool;

    /// Deliver a notification. Failures are logged by the caller and
    /// absorbed — they never fail the event-routing request (§4.8, §7).
    async fn notify(&self, probe_name: &str, address: &str, message: &str) -> Result<(), NotifyError>;
}
