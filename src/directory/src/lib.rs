//! # dirbac directory adapter
//!
//! Minimal access to a hierarchical directory: create entries and search
//! them, with every operation running on a connection borrowed from a pool.
//!
//! ## Backends
//!
//! - [`memory::InMemoryDirectory`]: an in-process tree, used by tests and
//!   embedders without a directory server
//! - [`ldap::LdapPool`]: an LDAP server via `ldap3` (feature `ldap`)
//!
//! ## Example
//!
//! ```rust
//! use dirbac_directory::{DirectoryAdapter, InMemoryDirectory, NewEntry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let directory = InMemoryDirectory::with_suffix("dc=test")?;
//!     let adapter = DirectoryAdapter::new(directory.pool());
//!
//!     adapter
//!         .create_entry(NewEntry::new("ou=Users,dc=test", "organizationalUnit"))
//!         .await?;
//!
//!     let found = adapter.search_children("dc=test", "(ou=*)", &["ou"]).await?;
//!     assert_eq!(found.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod connection;
pub mod dn;
pub mod entry;
pub mod error;
pub mod filter;
#[cfg(feature = "ldap")]
pub mod ldap;
pub mod memory;

pub use adapter::DirectoryAdapter;
pub use config::AdapterConfig;
pub use connection::{ConnectionPool, DirectoryConnection, SearchRequest, SearchScope};
pub use dn::{Dn, Rdn};
pub use entry::{DirectoryEntry, NewEntry, OBJECT_CLASS};
pub use error::{DirectoryError, Result};
pub use filter::Filter;
#[cfg(feature = "ldap")]
pub use ldap::{LdapConnection, LdapPool};
pub use memory::{InMemoryDirectory, MemoryConnection, MemoryPool};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
