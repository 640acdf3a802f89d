//! Error types for directory operations

use thiserror::Error;

/// Directory adapter errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Distinguished name could not be parsed
    #[error("Invalid DN: {0}")]
    InvalidDn(String),

    /// Search filter could not be parsed
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// An entry already exists at the given DN
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    /// The entry (or the parent of an entry being added) does not exist
    #[error("No such object: {0}")]
    NoSuchObject(String),

    /// The entry violates the directory schema
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Connection could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Any other result code reported by the directory server
    #[error("Directory protocol error: {0}")]
    Protocol(String),

    /// Adapter configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A connection could not be returned to its pool.
    ///
    /// `primary` holds the outcome of the operation that ran on the connection,
    /// when that operation failed as well.
    #[error("Could not release connection back to pool: {release}")]
    Release {
        release: String,
        #[source]
        primary: Option<Box<DirectoryError>>,
    },
}

impl DirectoryError {
    /// Whether this error reports an add against an occupied DN
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Whether this error is a pool release failure
    pub fn is_release_failure(&self) -> bool {
        matches!(self, Self::Release { .. })
    }
}

/// Result type for directory operations
pub type Result<T> = std::result::Result<T, DirectoryError>;
