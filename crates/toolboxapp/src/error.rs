use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Write failed for {collection}/{key}: {reason}")]
    WriteFailed {
        collection: String,
        key: String,
        reason: String,
    },

    #[error("Read failed for {collection}: {reason}")]
    ReadFailed { collection: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Preferences are not loaded yet")]
    NotReady,

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ToolboxError>;
