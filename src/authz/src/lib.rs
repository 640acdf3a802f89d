//! # dirbac authorization graph
//!
//! Role-based access control stored as a graph of directory entries instead of
//! an application database.
//!
//! ## Features
//!
//! - **Users, global groups, systems and roles** as directory entries at
//!   templated DNs
//! - **Idempotent assignments** that create the Roles container and the Role on
//!   demand
//! - **Effective access analysis**: direct roles plus roles inherited through
//!   global group membership
//! - **Any directory backend** implementing the `dirbac-directory` pool seam
//!
//! ## Example
//!
//! ```rust
//! use dirbac_authz::{AuthzGraph, GraphSchema, NewUser};
//! use dirbac_directory::{DirectoryAdapter, InMemoryDirectory, NewEntry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let directory = InMemoryDirectory::with_suffix("dc=test")?;
//!     let adapter = DirectoryAdapter::new(directory.pool());
//!     for context in ["ou=Users,dc=test", "ou=Groups,dc=test", "ou=Systems,dc=test"] {
//!         adapter.create_entry(NewEntry::new(context, "organizationalUnit")).await?;
//!     }
//!
//!     let graph = AuthzGraph::new(adapter, GraphSchema::default())?;
//!     graph.create_user(&NewUser::new("tester", "Tester")).await?;
//!     graph.create_global_group("Administrators", None).await?;
//!     graph.assign_user_to_global_group("tester", "Administrators").await?;
//!     graph.create_system("Datastore").await?;
//!     graph.assign_group_to_role("Administrators", "Auditor", "Datastore").await?;
//!
//!     let roles = graph.groups_and_roles_analysis("tester").await?;
//!     assert!(roles["Datastore"].contains("Auditor"));
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod read;
pub mod schema;
pub mod template;
pub mod types;
pub mod write;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{GraphError, Result};
pub use graph::AuthzGraph;
pub use layout::{EntryLayout, MembershipEdge, ParticipationEdge};
pub use schema::GraphSchema;
pub use template::compose;
pub use types::{AccessAnalysis, EffectiveRoles, NewUser};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
