use thiserror::Error;

/// Failures of the external persistent store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("the task store is not configured; set DATABASE_URL to connect one")]
    Unconfigured,
    #[error("record not found")]
    NotFound,
    #[error("store operation failed: {0}")]
    Failed(String),
}

impl StoreError {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        StoreError::Failed(err.to_string())
    }
}
