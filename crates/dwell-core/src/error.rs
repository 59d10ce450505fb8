use thiserror::Error;

/// Top-level error type for the dwell system.
///
/// Subsystem crates either map their failures into one of these variants or
/// define a narrower error of their own (see `dwell_chat::ChatError`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DwellError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for DwellError {
    fn from(err: toml::de::Error) -> Self {
        DwellError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DwellError {
    fn from(err: toml::ser::Error) -> Self {
        DwellError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DwellError {
    fn from(err: serde_json::Error) -> Self {
        DwellError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for dwell operations.
pub type Result<T> = std::result::Result<T, DwellError>;
