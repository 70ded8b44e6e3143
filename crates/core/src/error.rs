#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unsupported plugin type: {0}")]
    UnsupportedPluginType(String),

    #[error("Invalid filename: {0:?} has no usable characters")]
    InvalidFilename(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
