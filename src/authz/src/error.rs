//! Error types for the authorization graph

use dirbac_directory::DirectoryError;
use thiserror::Error;

/// Authorization graph errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// Bad or missing configuration, template/marker mismatch, invalid DN syntax
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A referenced user or group does not exist
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A directory search failed
    #[error("Directory read failed: {0}")]
    DirectoryRead(#[source] DirectoryError),

    /// A directory add failed
    #[error("Directory write failed: {0}")]
    DirectoryWrite(#[source] DirectoryError),

    /// A connection could not be returned to the pool.
    ///
    /// `primary` is the error of the operation that ran on the connection, if
    /// it failed as well.
    #[error("Directory connection error: {message}")]
    DirectoryConnection {
        message: String,
        #[source]
        primary: Option<Box<GraphError>>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
}

impl GraphError {
    /// Maps the error of a directory search
    pub fn read(error: DirectoryError) -> Self {
        Self::from_directory(error, Access::Read)
    }

    /// Maps the error of a directory add
    pub fn write(error: DirectoryError) -> Self {
        Self::from_directory(error, Access::Write)
    }

    fn from_directory(error: DirectoryError, access: Access) -> Self {
        match error {
            DirectoryError::InvalidDn(msg) => Self::Configuration(format!("Invalid DN: {}", msg)),
            DirectoryError::InvalidFilter(msg) => {
                Self::Configuration(format!("Invalid filter: {}", msg))
            }
            DirectoryError::Configuration(msg) => Self::Configuration(msg),
            DirectoryError::Release { release, primary } => Self::DirectoryConnection {
                message: release,
                primary: primary.map(|p| Box::new(Self::from_directory(*p, access))),
            },
            other => match access {
                Access::Read => Self::DirectoryRead(other),
                Access::Write => Self::DirectoryWrite(other),
            },
        }
    }

    /// The operation's own error carried by a release failure
    pub fn primary(&self) -> Option<&GraphError> {
        match self {
            Self::DirectoryConnection { primary, .. } => primary.as_deref(),
            _ => None,
        }
    }
}

/// Result type for authorization graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
