use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("provider quota exhausted (status {status}): {detail}")]
    Quota { status: u16, detail: String },

    #[error("provider retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("unexpected provider response: {0}")]
    UnexpectedResponse(String),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("missing provider credentials: {0}")]
    MissingCredentials(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("document has no usable text: {0}")]
    EmptyDocument(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("question must be a non-empty string")]
    EmptyQuestion,

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
