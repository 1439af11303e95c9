use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("directory entry not found: {0}")]
    NotFound(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("kv error: {0}")]
    Kv(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}
