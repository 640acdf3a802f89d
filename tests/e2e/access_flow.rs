//! End-to-end: configuration, graph construction, assignments and analysis
//!
//! The in-memory flow runs everywhere. The live flow needs a directory server
//! configured through `LDAP_*` variables and runs with `--ignored`.

use anyhow::Result;
use dirbac_authz::{AppConfig, AuthzGraph, GraphError, NewUser};
use dirbac_directory::{ConnectionPool, DirectoryAdapter, InMemoryDirectory, LdapPool, NewEntry};
use std::collections::HashMap;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

const CONFIG: &str = r#"
[directory]
host = "localhost"
reader_dn = "cn=admin,dc=example,dc=org"
reader_credentials = "admin"

[schema]
users_context = "ou=People,dc=example,dc=org"
groups_context = "ou=Teams,dc=example,dc=org"
systems_context = "ou=Applications,dc=example,dc=org"
system_dn_template = "ou=%s,ou=Applications,dc=example,dc=org"
roles_dn_template = "ou=Roles,ou=%s,ou=Applications,dc=example,dc=org"
role_dn_template = "ou=%s,ou=Roles,ou=%s,ou=Applications,dc=example,dc=org"
user_dn_template = "cn=%s,ou=People,dc=example,dc=org"
group_dn_template = "ou=%s,ou=Teams,dc=example,dc=org"
user_in_role_dn_template = "cn=%s,ou=%s,ou=Roles,ou=%s,ou=Applications,dc=example,dc=org"
user_in_group_dn_template = "cn=%s,ou=%s,ou=Teams,dc=example,dc=org"
"#;

async fn run_flow<P: ConnectionPool>(graph: &AuthzGraph<P>, suffix: &str) -> Result<()> {
    let user = format!("alice{}", suffix);
    let peer = format!("bob{}", suffix);
    let team = format!("Operators{}", suffix);
    let system = format!("Datastore{}", suffix);

    graph
        .create_user(&NewUser::new(user.as_str(), "Liddell").with_mail("alice@example.org"))
        .await?;
    graph.create_user(&NewUser::new(peer.as_str(), "Builder")).await?;
    graph.create_global_group(&team, Some("On-call operators")).await?;
    assert!(!graph.system_exists(&system).await?);
    graph.create_system(&system).await?;

    graph.assign_user_to_global_group(&user, &team).await?;
    graph.assign_user_to_role(&user, "Reader", &system).await?;
    graph.assign_group_to_role(&team, "Operator", &system).await?;
    graph.assign_group_to_role(&team, "Operator", &system).await?;
    graph.assign_user_to_role(&peer, "Writer", &system).await?;
    info!(user = %user, group = %team, system = %system, "Graph seeded, analyzing");

    let analysis = graph.analyze_user(&user).await?;
    info!(
        user = %user,
        groups = analysis.groups.len(),
        systems = analysis.roles.len(),
        "Analysis complete"
    );
    assert!(analysis.groups.contains(&team));
    assert_eq!(
        analysis.roles[&system].iter().cloned().collect::<Vec<_>>(),
        vec!["Operator".to_string(), "Reader".to_string()]
    );
    assert!(!analysis.has_role(&system, "Writer"));

    let peer_roles = graph.groups_and_roles_analysis(&peer).await?;
    assert_eq!(peer_roles[&system].len(), 1);

    assert_eq!(graph.get_users_in_role("Operator", &system).await?.len(), 1);
    assert!(graph.get_roles_in_system(&system).await?.contains("Writer"));
    assert!(graph.is_member_of_global_group(&user, &team).await?);

    let json = serde_json::to_string(&analysis)?;
    assert!(json.contains("\"Operator\""));
    Ok(())
}

#[tokio::test]
async fn test_in_memory_access_flow() -> Result<()> {
    init_tracing();
    let config = AppConfig::from_toml(CONFIG)?;

    let directory = InMemoryDirectory::with_suffix("dc=example,dc=org")?;
    let adapter = DirectoryAdapter::new(directory.pool());
    for context in [
        &config.schema.users_context,
        &config.schema.groups_context,
        &config.schema.systems_context,
    ] {
        adapter
            .create_entry(NewEntry::new(context.as_str(), "organizationalUnit"))
            .await?;
    }

    let graph = AuthzGraph::new(adapter, config.schema.clone())?;
    run_flow(&graph, "").await?;

    assert_eq!(graph.adapter().pool().outstanding(), 0);

    let err = graph.groups_and_roles_analysis("nobody").await.unwrap_err();
    assert!(matches!(err, GraphError::InvalidParameter(_)));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_live_access_flow() -> Result<()> {
    init_tracing();
    let env: HashMap<String, String> = std::env::vars()
        .filter(|(key, _)| key.starts_with("LDAP_"))
        .collect();
    let config = AppConfig::from_map(&env)?;

    let pool = LdapPool::new(config.directory.clone())?;
    let graph = AuthzGraph::new(DirectoryAdapter::new(pool), config.schema.clone())?;

    let suffix = format!("-{}", std::process::id());
    run_flow(&graph, &suffix).await?;

    graph.adapter().pool().close().await;
    Ok(())
}
