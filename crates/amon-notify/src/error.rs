use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no notification plugin accepts medium attribute '{0}'")]
    NoAcceptor(String),

    #[error("unknown plugin kind: {0}")]
    UnknownKind(String),

    #[error("plugin '{plugin}' delivery failed: {message}")]
    DeliveryFailed { plugin: String, message: String },
}
