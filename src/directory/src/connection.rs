//! Connection and pool seams implemented by each directory backend

use crate::entry::{DirectoryEntry, NewEntry};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far below the base DN a search descends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Only the base entry itself
    Object,
    /// Immediate children of the base entry
    OneLevel,
    /// The base entry and everything below it
    Subtree,
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::OneLevel => write!(f, "onelevel"),
            Self::Subtree => write!(f, "subtree"),
        }
    }
}

/// A search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// DN the search starts from
    pub base: String,

    /// Search scope
    pub scope: SearchScope,

    /// Filter in RFC 4515 string form
    pub filter: String,

    /// Attributes to return (`*` for all user attributes)
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Create a search request
    pub fn new(
        base: impl Into<String>,
        scope: SearchScope,
        filter: impl Into<String>,
        attributes: &[&str],
    ) -> Self {
        Self {
            base: base.into(),
            scope,
            filter: filter.into(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// A single connection to a directory server
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Add one entry
    async fn add(&mut self, entry: &NewEntry) -> Result<()>;

    /// Execute a search. A missing base entry yields an empty result.
    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>>;
}

/// A source of directory connections
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Connection type handed out by this pool
    type Connection: DirectoryConnection;

    /// Borrow a connection
    async fn acquire(&self) -> Result<Self::Connection>;

    /// Give a borrowed connection back
    async fn release(&self, connection: Self::Connection) -> Result<()>;
}
