use std::fmt;

use thiserror::Error;

/// Pipeline stage an invocation was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Provision,
    Embed,
    Enrich,
    Insert,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Provision => "provision",
            Stage::Embed => "embed",
            Stage::Enrich => "enrich",
            Stage::Insert => "insert",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Client init error: {0}")]
    ClientInit(String),

    #[error("Provisioning error: {0}")]
    Provisioning(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Record has no string `title` field")]
    MissingTitle,

    #[error("Insert error: {0}")]
    Insert(String),
}

pub type IngestResult<T> = Result<T, IngestError>;

impl IngestError {
    /// Stage of the pipeline this error terminates.
    ///
    /// Client initialisation happens while provisioning, so it reports
    /// [`Stage::Provision`].
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::Parse(_) => Stage::Parse,
            IngestError::ClientInit(_) | IngestError::Provisioning(_) => Stage::Provision,
            IngestError::Embedding(_) => Stage::Embed,
            IngestError::MissingTitle => Stage::Enrich,
            IngestError::Insert(_) => Stage::Insert,
        }
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Parse(format!("JSON error: {}", err))
    }
}

/// Errors reported by a [`crate::store::DocumentStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Collection already exists: {0}")]
    AlreadyExists(String),

    #[error("Document already exists: {0}")]
    DuplicateDocument(String),

    #[error("Data API error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::InvalidResponse(format!("JSON error: {}", err))
    }
}
