//! Directory adapter: validated requests executed on pooled connections
//!
//! Every operation borrows one connection from the pool through
//! [`DirectoryAdapter::with_connection`], which returns the connection on every
//! exit path, panics included. A failed release is reported as
//! [`DirectoryError::Release`], carrying the operation's own error when there
//! was one.

use crate::connection::{ConnectionPool, DirectoryConnection, SearchRequest, SearchScope};
use crate::dn::Dn;
use crate::entry::{DirectoryEntry, NewEntry};
use crate::error::{DirectoryError, Result};
use crate::filter::Filter;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, trace};

/// Executes create and search operations against a pooled directory
pub struct DirectoryAdapter<P: ConnectionPool> {
    pool: Arc<P>,
}

impl<P: ConnectionPool> Clone for DirectoryAdapter<P> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<P: ConnectionPool> DirectoryAdapter<P> {
    /// Create an adapter over a pool
    pub fn new(pool: P) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create an adapter sharing an existing pool
    pub fn from_shared(pool: Arc<P>) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// Runs `op` on a borrowed connection and returns the connection afterwards.
    ///
    /// The connection goes back to the pool whether `op` succeeds, fails or
    /// panics. When the operation panicked, the panic is resumed after the
    /// release.
    pub async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut P::Connection) -> BoxFuture<'c, Result<T>> + Send,
    {
        let mut connection = self.pool.acquire().await?;
        let outcome = AssertUnwindSafe(op(&mut connection)).catch_unwind().await;
        let released = self.pool.release(connection).await;

        match (outcome, released) {
            (Ok(result), Ok(())) => result,
            (Ok(result), Err(release_error)) => {
                error!(error = %release_error, "Could not release connection back to pool");
                Err(DirectoryError::Release {
                    release: release_error.to_string(),
                    primary: result.err().map(Box::new),
                })
            }
            (Err(panic), released) => {
                if let Err(release_error) = released {
                    error!(
                        error = %release_error,
                        "Could not release connection back to pool after a panicking operation"
                    );
                }
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Add one entry
    pub async fn create_entry(&self, entry: NewEntry) -> Result<()> {
        Dn::new(&entry.dn)?;
        if entry.object_classes.is_empty() {
            return Err(DirectoryError::SchemaViolation(format!(
                "entry {} has no object class",
                entry.dn
            )));
        }

        trace!(dn = %entry.dn, "Creating directory entry");
        self.with_connection(move |connection| {
            async move { connection.add(&entry).await }.boxed()
        })
        .await
    }

    /// Execute a validated search
    pub async fn search(&self, request: SearchRequest) -> Result<Vec<DirectoryEntry>> {
        Dn::new(&request.base)?;
        Filter::parse(&request.filter)?;

        trace!(
            base = %request.base,
            scope = %request.scope,
            filter = %request.filter,
            "Searching directory"
        );
        self.with_connection(move |connection| {
            async move { connection.search(&request).await }.boxed()
        })
        .await
    }

    /// Object-scope search: the entry at `dn` if it exists and matches `filter`
    pub async fn search_one(
        &self,
        dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Option<DirectoryEntry>> {
        let entries = self
            .search(SearchRequest::new(dn, SearchScope::Object, filter, attributes))
            .await?;
        Ok(entries.into_iter().next())
    }

    /// One-level search below `base`
    pub async fn search_children(
        &self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        self.search(SearchRequest::new(base, SearchScope::OneLevel, filter, attributes))
            .await
    }

    /// Subtree search from `base`
    pub async fn search_subtree(
        &self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        self.search(SearchRequest::new(base, SearchScope::Subtree, filter, attributes))
            .await
    }
}
