//! Error types for taskflow

use crate::task::TaskId;
use thiserror::Error;

/// Failure of the durable key-value slot.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Rejected store operation. Persistence faults never surface here.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("duplicate task id {0}")]
    DuplicateId(TaskId),
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;
