//! dirbac - manage and inspect a directory-backed RBAC graph

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dirbac_authz::{AppConfig, AuthzGraph, NewUser};
use dirbac_directory::{DirectoryAdapter, LdapPool};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::info;

/// dirbac CLI
#[derive(Parser)]
#[command(name = "dirbac")]
#[command(about = "Role-based access control stored in an LDAP directory")]
#[command(version)]
struct Cli {
    /// Path to configuration file; `LDAP_*` environment variables are used when absent
    #[arg(short, long, env = "DIRBAC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a system
    CreateSystem { name: String },

    /// Create a user
    CreateUser {
        id: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        mail: Option<String>,
        #[arg(long, env = "DIRBAC_USER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create a global group
    CreateGroup {
        id: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Add a user to a global group
    AddMember { user: String, group: String },

    /// Give a user a role in a system
    AssignUser {
        user: String,
        role: String,
        system: String,
    },

    /// Give a global group a role in a system
    AssignGroup {
        group: String,
        role: String,
        system: String,
    },

    /// List systems
    Systems,

    /// List global groups
    Groups,

    /// List the roles of a system
    Roles { system: String },

    /// List the members of a global group, or of a role when a system is given
    Members {
        name: String,
        #[arg(long)]
        system: Option<String>,
    },

    /// Show a user's effective roles
    Analyze {
        user: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},dirbac_authz={}", log_level, log_level).into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => {
            let env: HashMap<String, String> = std::env::vars()
                .filter(|(key, _)| key.starts_with("LDAP_"))
                .collect();
            AppConfig::from_map(&env).context("Failed to read LDAP_* environment")?
        }
    };

    let pool = LdapPool::new(config.directory.clone()).context("Failed to configure LDAP pool")?;
    let graph = AuthzGraph::new(DirectoryAdapter::new(pool), config.schema.clone())?;

    run(&graph, cli.command).await?;

    graph.adapter().pool().close().await;
    Ok(())
}

async fn run(graph: &AuthzGraph<LdapPool>, command: Command) -> Result<()> {
    match command {
        Command::CreateSystem { name } => {
            if graph.system_exists(&name).await? {
                anyhow::bail!("System {} already exists", name);
            }
            println!("{}", graph.create_system(&name).await?);
        }
        Command::CreateUser {
            id,
            last_name,
            first_name,
            mail,
            password,
        } => {
            let user = NewUser {
                id,
                last_name,
                first_name,
                mail,
                password,
            };
            println!("{}", graph.create_user(&user).await?);
        }
        Command::CreateGroup { id, description } => {
            if graph.global_group_exists(&id).await? {
                anyhow::bail!("Group {} already exists", id);
            }
            println!("{}", graph.create_global_group(&id, description.as_deref()).await?);
        }
        Command::AddMember { user, group } => {
            println!("{}", graph.assign_user_to_global_group(&user, &group).await?);
        }
        Command::AssignUser { user, role, system } => {
            println!("{}", graph.assign_user_to_role(&user, &role, &system).await?);
        }
        Command::AssignGroup {
            group,
            role,
            system,
        } => {
            println!("{}", graph.assign_group_to_role(&group, &role, &system).await?);
        }
        Command::Systems => print_names(graph.get_systems().await?),
        Command::Groups => print_names(graph.get_global_groups().await?),
        Command::Roles { system } => print_names(graph.get_roles_in_system(&system).await?),
        Command::Members { name, system } => {
            let members = match system {
                Some(system) => graph.get_users_in_role(&name, &system).await?,
                None => graph.get_users_in_global_group(&name).await?,
            };
            print_names(members);
        }
        Command::Analyze { user, json } => {
            let analysis = graph.analyze_user(&user).await?;
            info!(user = %user, dn = %analysis.user_dn, "Analysis complete");
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                println!("{}", analysis.user_dn);
                for group in &analysis.groups {
                    println!("  group {}", group);
                }
                for (system, roles) in &analysis.roles {
                    let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
                    println!("  {}: {}", system, roles.join(", "));
                }
            }
        }
    }
    Ok(())
}

fn print_names(names: BTreeSet<String>) {
    for name in names {
        println!("{}", name);
    }
}
