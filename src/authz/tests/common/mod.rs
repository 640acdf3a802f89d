//! Shared fixtures: an in-memory `dc=test` directory with the three contexts

#![allow(dead_code)]

use dirbac_authz::{AuthzGraph, GraphSchema, NewUser};
use dirbac_directory::{DirectoryAdapter, InMemoryDirectory, MemoryPool, NewEntry};
use std::sync::Arc;

pub struct Fixture {
    pub graph: AuthzGraph<MemoryPool>,
    pub directory: InMemoryDirectory,
    pub pool: Arc<MemoryPool>,
}

pub async fn fixture() -> Fixture {
    let directory = InMemoryDirectory::with_suffix("dc=test").unwrap();
    let pool = Arc::new(directory.pool());
    let adapter = DirectoryAdapter::from_shared(Arc::clone(&pool));

    for context in ["ou=Users,dc=test", "ou=Groups,dc=test", "ou=Systems,dc=test"] {
        adapter
            .create_entry(NewEntry::new(context, "organizationalUnit"))
            .await
            .unwrap();
    }

    let graph = AuthzGraph::new(adapter, GraphSchema::default()).unwrap();
    Fixture {
        graph,
        directory,
        pool,
    }
}

/// `tester` in `Administrators`, system `Datastore`
pub async fn seeded() -> Fixture {
    let fixture = fixture().await;
    let graph = &fixture.graph;

    graph
        .create_user(&NewUser::new("tester", "Tester").with_first_name("Test"))
        .await
        .unwrap();
    graph
        .create_global_group("Administrators", Some("Administrators of everything"))
        .await
        .unwrap();
    graph
        .assign_user_to_global_group("tester", "Administrators")
        .await
        .unwrap();
    graph.create_system("Datastore").await.unwrap();

    fixture
}
