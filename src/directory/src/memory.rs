//! In-memory directory backend
//!
//! Keeps a tree of entries keyed by normalized DN and enforces the directory
//! rules the authorization graph depends on: unique DNs, existing parents,
//! at least one object class. Used by tests and by embedders that do not need
//! a directory server.

use crate::connection::{ConnectionPool, DirectoryConnection, SearchRequest, SearchScope};
use crate::dn::Dn;
use crate::entry::{DirectoryEntry, NewEntry, OBJECT_CLASS};
use crate::error::{DirectoryError, Result};
use crate::filter::Filter;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tree {
    /// Naming contexts that may be added without a parent
    suffixes: Vec<Dn>,
    /// Entries keyed by normalized DN
    entries: BTreeMap<String, (Dn, DirectoryEntry)>,
}

/// Shared in-memory directory tree
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    tree: Arc<RwLock<Tree>>,
    read_only: Arc<AtomicBool>,
}

impl InMemoryDirectory {
    /// Create an empty directory without naming contexts
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding one naming context, e.g. `dc=test`
    pub fn with_suffix(suffix: &str) -> Result<Self> {
        let dn = Dn::new(suffix)?;
        let rdn = dn.rdn().ok_or_else(|| {
            DirectoryError::InvalidDn("the root DN is not a naming context".to_string())
        })?;

        let entry = DirectoryEntry::new(dn.as_str())
            .with_attribute(OBJECT_CLASS, "top")
            .with_attribute(OBJECT_CLASS, "domain")
            .with_attribute(rdn.attr(), rdn.value());

        let mut tree = Tree::default();
        tree.entries.insert(dn.normalized(), (dn.clone(), entry));
        tree.suffixes.push(dn);

        Ok(Self {
            tree: Arc::new(RwLock::new(tree)),
            read_only: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Reject all subsequent writes, as a server in read-only mode would
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of entries, naming contexts included
    pub async fn len(&self) -> usize {
        self.tree.read().await.entries.len()
    }

    /// Whether the directory holds no entries
    pub async fn is_empty(&self) -> bool {
        self.tree.read().await.entries.is_empty()
    }

    /// Fetch the entry stored at `dn`
    pub async fn get(&self, dn: &str) -> Result<Option<DirectoryEntry>> {
        let key = Dn::new(dn)?.normalized();
        Ok(self
            .tree
            .read()
            .await
            .entries
            .get(&key)
            .map(|(_, entry)| entry.clone()))
    }

    /// Add an entry
    pub async fn add(&self, new_entry: &NewEntry) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(DirectoryError::Protocol(format!(
                "result-code=53 (unwillingToPerform): directory is read-only, cannot add {}",
                new_entry.dn
            )));
        }

        let dn = Dn::new(&new_entry.dn)?;
        let rdn = dn
            .rdn()
            .cloned()
            .ok_or_else(|| DirectoryError::InvalidDn("cannot add the root DN".to_string()))?;
        if new_entry.object_classes.is_empty() {
            return Err(DirectoryError::SchemaViolation(format!(
                "entry {} has no object class",
                new_entry.dn
            )));
        }

        let mut tree = self.tree.write().await;
        let key = dn.normalized();
        if tree.entries.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists(new_entry.dn.clone()));
        }

        let is_suffix = tree.suffixes.iter().any(|s| *s == dn);
        let parent_exists = dn
            .parent()
            .map(|parent| tree.entries.contains_key(&parent.normalized()))
            .unwrap_or(false);
        if !is_suffix && !parent_exists {
            return Err(DirectoryError::NoSuchObject(format!(
                "parent of {} does not exist",
                new_entry.dn
            )));
        }

        // The naming attribute value is part of the entry, as servers add it on their own
        let mut entry = new_entry.to_directory_entry();
        let rdn_value = rdn.value();
        let has_rdn_value = entry
            .get_all(rdn.attr())
            .iter()
            .any(|v| v.eq_ignore_ascii_case(&rdn_value));
        if !has_rdn_value {
            let existing = entry
                .attributes
                .keys()
                .find(|k| k.eq_ignore_ascii_case(rdn.attr()))
                .cloned()
                .unwrap_or_else(|| rdn.attr().to_string());
            entry.attributes.entry(existing).or_default().push(rdn_value);
        }

        tree.entries.insert(key, (dn, entry));
        Ok(())
    }

    /// Execute a search
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        let base = Dn::new(&request.base)?;
        let filter = Filter::parse(&request.filter)?;

        let tree = self.tree.read().await;
        if !base.is_root() && !tree.entries.contains_key(&base.normalized()) {
            return Ok(Vec::new());
        }

        let in_scope = |dn: &Dn| match request.scope {
            SearchScope::Object => *dn == base,
            SearchScope::OneLevel => dn.is_child_of(&base),
            SearchScope::Subtree => dn.relative_to(&base).is_some(),
        };

        Ok(tree
            .entries
            .values()
            .filter(|(dn, entry)| in_scope(dn) && filter.matches(entry))
            .map(|(_, entry)| project(entry, &request.attributes))
            .collect())
    }

    /// A pool handing out connections to this directory
    pub fn pool(&self) -> MemoryPool {
        MemoryPool::new(self.clone())
    }
}

/// Keeps only the requested attributes. An empty list or `*` selects all of them.
fn project(entry: &DirectoryEntry, attributes: &[String]) -> DirectoryEntry {
    if attributes.is_empty() || attributes.iter().any(|a| a == "*") {
        return entry.clone();
    }

    DirectoryEntry {
        dn: entry.dn.clone(),
        attributes: entry
            .attributes
            .iter()
            .filter(|(name, _)| attributes.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect(),
    }
}

/// Connection to an [`InMemoryDirectory`].
///
/// Counts as outstanding on its pool until dropped, so an operation abandoned
/// mid-flight does not leak the count.
#[derive(Debug)]
pub struct MemoryConnection {
    directory: InMemoryDirectory,
    outstanding: Arc<AtomicUsize>,
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DirectoryConnection for MemoryConnection {
    async fn add(&mut self, entry: &NewEntry) -> Result<()> {
        self.directory.add(entry).await
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        self.directory.search(request).await
    }
}

/// Pool over an [`InMemoryDirectory`] with counters and fault injection
#[derive(Debug)]
pub struct MemoryPool {
    directory: InMemoryDirectory,
    outstanding: Arc<AtomicUsize>,
    acquired: AtomicUsize,
    unavailable: AtomicBool,
    release_failure: AtomicBool,
}

impl MemoryPool {
    /// Create a pool over a directory
    pub fn new(directory: InMemoryDirectory) -> Self {
        Self {
            directory,
            outstanding: Arc::new(AtomicUsize::new(0)),
            acquired: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            release_failure: AtomicBool::new(false),
        }
    }

    /// The directory behind this pool
    pub fn directory(&self) -> &InMemoryDirectory {
        &self.directory
    }

    /// Connections currently borrowed
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Connections handed out since the pool was created
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Make `acquire` fail, as if the server were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `release` fail. The connection is discarded either way.
    pub fn set_release_failure(&self, fail: bool) {
        self.release_failure.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionPool for MemoryPool {
    type Connection = MemoryConnection;

    async fn acquire(&self) -> Result<MemoryConnection> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Connection(
                "in-memory directory is unavailable".to_string(),
            ));
        }
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            directory: self.directory.clone(),
            outstanding: Arc::clone(&self.outstanding),
        })
    }

    async fn release(&self, connection: MemoryConnection) -> Result<()> {
        drop(connection);
        if self.release_failure.load(Ordering::SeqCst) {
            return Err(DirectoryError::Connection(
                "pool rejected returned connection".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ou(dn: &str, name: &str) -> NewEntry {
        NewEntry::new(dn, "organizationalUnit").with_attribute("ou", name)
    }

    #[tokio::test]
    async fn test_add_requires_parent() {
        let directory = InMemoryDirectory::with_suffix("dc=test").unwrap();

        let err = directory
            .add(&ou("ou=Roles,ou=Datastore,ou=Systems,dc=test", "Roles"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NoSuchObject(_)));

        directory.add(&ou("ou=Systems,dc=test", "Systems")).await.unwrap();
        directory.add(&ou("ou=Datastore,ou=Systems,dc=test", "Datastore")).await.unwrap();
        directory
            .add(&ou("ou=Roles,ou=Datastore,ou=Systems,dc=test", "Roles"))
            .await
            .unwrap();
        assert_eq!(directory.len().await, 4);
    }

    #[tokio::test]
    async fn test_duplicate_add_is_rejected() {
        let directory = InMemoryDirectory::with_suffix("dc=test").unwrap();
        directory.add(&ou("ou=Groups,dc=test", "Groups")).await.unwrap();

        let err = directory.add(&ou("OU=groups, dc=test", "Groups")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_naming_attribute_is_added() {
        let directory = InMemoryDirectory::with_suffix("dc=test").unwrap();
        directory
            .add(&NewEntry::new("ou=Users,dc=test", "organizationalUnit"))
            .await
            .unwrap();

        let entry = directory.get("ou=Users,dc=test").await.unwrap().unwrap();
        assert_eq!(entry.get("ou"), Some("Users"));
        assert!(entry.has_object_class("organizationalUnit"));
    }

    #[tokio::test]
    async fn test_search_scopes() {
        let directory = InMemoryDirectory::with_suffix("dc=test").unwrap();
        directory.add(&ou("ou=Groups,dc=test", "Groups")).await.unwrap();
        directory.add(&ou("ou=Administrators,ou=Groups,dc=test", "Administrators")).await.unwrap();
        directory
            .add(
                &NewEntry::new("cn=tester,ou=Administrators,ou=Groups,dc=test", "groupOfNames")
                    .with_attribute("member", "cn=tester,ou=Users,dc=test"),
            )
            .await
            .unwrap();

        let search =
            |scope| SearchRequest::new("ou=Groups,dc=test", scope, "(objectClass=*)", &["*"]);

        assert_eq!(directory.search(&search(SearchScope::Object)).await.unwrap().len(), 1);
        assert_eq!(directory.search(&search(SearchScope::OneLevel)).await.unwrap().len(), 1);
        assert_eq!(directory.search(&search(SearchScope::Subtree)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_missing_base_is_empty() {
        let directory = InMemoryDirectory::with_suffix("dc=test").unwrap();
        let request = SearchRequest::new(
            "ou=Nowhere,dc=test",
            SearchScope::Subtree,
            "(objectClass=*)",
            &["*"],
        );
        assert!(directory.search(&request).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attribute_projection() {
        let directory = InMemoryDirectory::with_suffix("dc=test").unwrap();
        directory
            .add(&ou("ou=Groups,dc=test", "Groups").with_attribute("description", "Global groups"))
            .await
            .unwrap();

        let request =
            SearchRequest::new("ou=Groups,dc=test", SearchScope::Object, "(ou=*)", &["OU"]);
        let found = directory.search(&request).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("ou"), Some("Groups"));
        assert!(found[0].get("description").is_none());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let directory = InMemoryDirectory::with_suffix("dc=test").unwrap();
        directory.set_read_only(true);

        let err =
            tokio_test::block_on(directory.add(&ou("ou=Groups,dc=test", "Groups"))).unwrap_err();
        assert!(matches!(err, DirectoryError::Protocol(_)));

        directory.set_read_only(false);
        tokio_test::block_on(directory.add(&ou("ou=Groups,dc=test", "Groups"))).unwrap();
    }

    #[tokio::test]
    async fn test_pool_counts_connections() {
        let pool = InMemoryDirectory::with_suffix("dc=test").unwrap().pool();

        let connection = pool.acquire().await.unwrap();
        assert_eq!(pool.outstanding(), 1);
        pool.release(connection).await.unwrap();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.acquired(), 1);

        pool.set_release_failure(true);
        let connection = pool.acquire().await.unwrap();
        assert!(pool.release(connection).await.is_err());
        assert_eq!(pool.outstanding(), 0);

        pool.set_unavailable(true);
        assert!(matches!(pool.acquire().await, Err(DirectoryError::Connection(_))));
    }
}
