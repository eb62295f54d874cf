use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReflowError {
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Page {page} not found in session {session}")]
    PageNotFound { session: Uuid, page: Uuid },

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Session {0} has no pages to process")]
    EmptySession(Uuid),

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("Document for session {0} is not ready yet")]
    DocumentNotReady(Uuid),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReflowError>;
