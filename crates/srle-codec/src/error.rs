use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Artifact has no [DATA] delimiter")]
    MissingDelimiter,
    #[error("Malformed header: {0}")]
    MalformedHeader(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
