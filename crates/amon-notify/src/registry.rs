use std::sync::Arc;

use crate::error::NotifyError;
use crate::plugin::NotificationPlugin;

/// §5/§9: a process-wide singleton, initialized once from config at
/// startup, then read-only. Grounded on `DriverRegistry::for_cloud`'s
/// "iterate registered implementations until one matches" shape, applied
/// here to notification media instead of cloud targets.
pub struct NotificationRegistry {
    plugins: Vec<Arc<dyn NotificationPlugin>>,
}

impl NotificationRegistry {
    pub fn new(plugins: Vec<Arc<dyn NotificationPlugin>>) -> Self {
        Self { plugins }
    }

    /// The first plugin accepting `attr_name`, or `NoAcceptor` if none do
    /// (§4.6: "If none accept, resolution fails with invalid-argument").
    pub fn for_medium(&self, attr_name: &str) -> Result<Arc<dyn NotificationPlugin>, NotifyError> {
        self.plugins
            .iter()
            .find(|p| p.accepts_medium(attr_name))
            .cloned()
            .ok_or_else(|| NotifyError::NoAcceptor(attr_name.to_string()))
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Stub {
        name: &'static str,
        medium: &'static str,
    }

    #[async_trait]
    impl NotificationPlugin for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn accepts_medium(&self, attr_name: &str) -> bool {
            attr_name == self.medium
        }
        async fn notify(&self, _probe_name: &str, _address: &str, _message: &str) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    #[test]
    fn first_acceptor_wins() {
        let reg = NotificationRegistry::new(vec![
            Arc::new(Stub { name: "email", medium: "email" }),
            Arc::new(Stub { name: "sms", medium: "sms" }),
        ]);
        assert_eq!(reg.for_medium("sms").unwrap().name(), "sms");
    }

    #[test]
    fn no_acceptor_is_an_error() {
        let reg = NotificationRegistry::new(vec![Arc::new(Stub { name: "email", medium: "email" })]);
        assert!(matches!(reg.for_medium("pager"), Err(NotifyError::NoAcceptor(_))));
    }
}
