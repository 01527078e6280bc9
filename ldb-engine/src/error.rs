//! Error handling for the LDB engine
//!
//! Collaborator, catalog and configuration operations return `LdbResult`.
//! The recordset fetcher itself never surfaces these errors to its caller:
//! it logs them and reports the number of records delivered so far.

use thiserror::Error;

/// Main error type for the LDB engine
#[derive(Error, Debug)]
pub enum LdbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Malformed node at offset {offset}: {reason}")]
    MalformedNode { offset: u64, reason: String },
}

impl LdbError {
    /// Build a malformed node error
    pub fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        LdbError::MalformedNode {
            offset,
            reason: reason.into(),
        }
    }

    /// Check if this error means the requested object simply is not there
    pub fn is_not_found(&self) -> bool {
        match self {
            LdbError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            LdbError::TableNotFound(_) => true,
            _ => false,
        }
    }
}

impl From<toml::de::Error> for LdbError {
    fn from(err: toml::de::Error) -> Self {
        LdbError::InvalidConfig(err.to_string())
    }
}

/// Result type for LDB operations
pub type LdbResult<T> = Result<T, LdbError>;
