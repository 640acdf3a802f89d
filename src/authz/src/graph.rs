//! The authorization graph over a directory
//!
//! [`AuthzGraph`] ties a validated [`GraphSchema`] to a [`DirectoryAdapter`].
//! Its operations are split by concern: `write` builds the graph, `read`
//! answers existence and enumeration queries, `analysis` derives effective
//! roles.

use crate::error::{GraphError, Result};
use crate::layout::EntryLayout;
use crate::schema::GraphSchema;
use dirbac_directory::{ConnectionPool, DirectoryAdapter, DirectoryEntry, Dn, NewEntry};
use std::sync::Arc;
use tracing::debug;

/// Attribute selector asking for no attributes at all
pub(crate) const NO_ATTRIBUTES: &[&str] = &["1.1"];

/// Role-based access control stored as directory entries
pub struct AuthzGraph<P: ConnectionPool> {
    adapter: DirectoryAdapter<P>,
    schema: Arc<GraphSchema>,
    layout: Arc<EntryLayout>,
}

impl<P: ConnectionPool> Clone for AuthzGraph<P> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            schema: Arc::clone(&self.schema),
            layout: Arc::clone(&self.layout),
        }
    }
}

impl<P: ConnectionPool> AuthzGraph<P> {
    /// Create a graph over `adapter`. The schema is validated here, once.
    pub fn new(adapter: DirectoryAdapter<P>, schema: GraphSchema) -> Result<Self> {
        schema.validate()?;
        let layout = EntryLayout::new(&schema)?;
        Ok(Self {
            adapter,
            schema: Arc::new(schema),
            layout: Arc::new(layout),
        })
    }

    /// The schema in use
    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    /// The directory adapter in use
    pub fn adapter(&self) -> &DirectoryAdapter<P> {
        &self.adapter
    }

    pub(crate) fn layout(&self) -> &EntryLayout {
        &self.layout
    }

    /// Adds an entry; an occupied DN is an error
    pub(crate) async fn create(&self, entry: NewEntry) -> Result<()> {
        self.adapter.create_entry(entry).await.map_err(GraphError::write)
    }

    /// Adds an entry unless another caller created it first.
    ///
    /// Returns whether this call created it.
    pub(crate) async fn create_if_absent(&self, entry: NewEntry) -> Result<bool> {
        let dn = entry.dn.clone();
        match self.adapter.create_entry(entry).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_already_exists() => {
                debug!(dn = %dn, "Entry was created concurrently, keeping it");
                Ok(false)
            }
            Err(e) => Err(GraphError::write(e)),
        }
    }

    pub(crate) async fn search_one(
        &self,
        dn: &str,
        filter: &str,
    ) -> Result<Option<DirectoryEntry>> {
        self.fetch(dn, filter, NO_ATTRIBUTES).await
    }

    /// The entry at `dn` with the requested attributes, if it matches `filter`
    pub(crate) async fn fetch(
        &self,
        dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Option<DirectoryEntry>> {
        self.adapter
            .search_one(dn, filter, attributes)
            .await
            .map_err(GraphError::read)
    }

    pub(crate) async fn search_children(
        &self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        self.adapter
            .search_children(base, filter, attributes)
            .await
            .map_err(GraphError::read)
    }

    pub(crate) async fn search_subtree(
        &self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        self.adapter
            .search_subtree(base, filter, attributes)
            .await
            .map_err(GraphError::read)
    }
}

/// Value of the leading RDN of `dn`
pub(crate) fn leading_value(dn: &str) -> Result<String> {
    let parsed = Dn::new(dn).map_err(|e| GraphError::Configuration(e.to_string()))?;
    parsed
        .rdn()
        .map(|rdn| rdn.value())
        .ok_or_else(|| GraphError::Configuration(format!("Entry \"{}\" has no RDN", dn)))
}
