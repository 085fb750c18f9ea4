use crate::records::TableName;
use std::fmt;
use thiserror::Error;

/// Which half of a whole-table round trip failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Read,
    Write,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::Read => f.write_str("read"),
            StoreOp::Write => f.write_str("write"),
        }
    }
}

/// Failure reported by a concrete backend before it is tagged with a table
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}

/// I/O or connectivity failure against one worksheet
#[derive(Debug, Error)]
#[error("{op} of worksheet {table} failed: {source}")]
pub struct StoreError {
    pub table: TableName,
    pub op: StoreOp,
    #[source]
    pub source: BackendError,
}

impl StoreError {
    pub fn read(table: TableName, source: BackendError) -> Self {
        StoreError {
            table,
            op: StoreOp::Read,
            source,
        }
    }

    pub fn write(table: TableName, source: BackendError) -> Self {
        StoreError {
            table,
            op: StoreOp::Write,
            source,
        }
    }
}

/// Every error an operation can surface to the dashboard
///
/// None of these is fatal: the caller reports the message and the pilot may
/// retry. An operation that fails never writes a partial table.
#[derive(Debug, Error)]
pub enum LaunchpadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl LaunchpadError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        LaunchpadError::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LaunchpadError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchpadError>;
