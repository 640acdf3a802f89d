//! Write path: entities, containers and edges
//!
//! Systems, users and global groups are created once; an occupied DN is an
//! error. Role assignments and group memberships are idempotent and create
//! the Roles container and the Role on demand. An edge DN already held by a
//! different principal is rejected.

use crate::error::{GraphError, Result};
use crate::graph::{AuthzGraph, NO_ATTRIBUTES};
use crate::schema::{CONTAINER_OBJECT_CLASS, EDGE_NAMING_ATTRIBUTE};
use crate::types::NewUser;
use dirbac_directory::{ConnectionPool, DirectoryError, Dn, Filter, NewEntry, OBJECT_CLASS};
use tracing::{debug, info};

impl<P: ConnectionPool> AuthzGraph<P> {
    /// Creates a system and returns its DN.
    ///
    /// Callers check [`system_exists`](Self::system_exists) first; an existing
    /// system is reported as a write error.
    pub async fn create_system(&self, system: &str) -> Result<String> {
        let schema = self.schema();
        let dn = schema.system_dn(system)?;
        let entry = NewEntry::new(dn.as_str(), CONTAINER_OBJECT_CLASS)
            .with_attribute(schema.system_name_attribute.as_str(), system);

        self.create(entry).await?;
        info!(system = %system, dn = %dn, "Created system");
        Ok(dn)
    }

    /// Creates a user in the Users context and returns its DN
    pub async fn create_user(&self, user: &NewUser) -> Result<String> {
        let schema = self.schema();
        let dn = schema.user_dn(&user.id)?;
        let entry = NewEntry::new(dn.as_str(), schema.user_object_class.as_str())
            .with_attribute("cn", user.id.as_str())
            .with_attribute(schema.user_id_attribute.as_str(), user.id.as_str())
            .with_attribute(
                schema.user_last_name_attribute.as_str(),
                user.last_name.as_str(),
            )
            .with_optional_attribute(
                schema.user_first_name_attribute.as_str(),
                user.first_name.as_deref(),
            )
            .with_optional_attribute(schema.user_mail_attribute.as_str(), user.mail.as_deref())
            .with_optional_attribute(
                schema.user_password_attribute.as_str(),
                user.password.as_deref(),
            );

        self.create(entry).await?;
        info!(user = %user.id, dn = %dn, "Created user");
        Ok(dn)
    }

    /// Creates a global group and returns its DN
    pub async fn create_global_group(
        &self,
        group: &str,
        description: Option<&str>,
    ) -> Result<String> {
        let schema = self.schema();
        let dn = schema.group_dn(group)?;
        let entry = NewEntry::new(dn.as_str(), CONTAINER_OBJECT_CLASS)
            .with_attribute(schema.group_id_attribute.as_str(), group)
            .with_optional_attribute(schema.group_description_attribute.as_str(), description);

        self.create(entry).await?;
        info!(group = %group, dn = %dn, "Created global group");
        Ok(dn)
    }

    /// Gives a user a role in a system and returns the participation DN
    pub async fn assign_user_to_role(
        &self,
        user: &str,
        role: &str,
        system: &str,
    ) -> Result<String> {
        let schema = self.schema();
        let user_dn = schema.user_dn(user)?;
        if self.find_object_by_dn(&user_dn).await?.is_none() {
            return Err(GraphError::InvalidParameter(format!(
                "User {} does not exist ({})",
                user, user_dn
            )));
        }

        self.ensure_role(role, system).await?;

        let edge_dn = schema.user_in_role_dn(user, role, system)?;
        self.claim_edge(&edge_dn, user, &user_dn).await?;
        Ok(edge_dn)
    }

    /// Gives a global group a role in a system and returns the participation DN.
    ///
    /// An existing edge for the group is found by its `cn` and `member` below
    /// the role, not by DN alone.
    pub async fn assign_group_to_role(
        &self,
        group: &str,
        role: &str,
        system: &str,
    ) -> Result<String> {
        let schema = self.schema();
        let group_dn = schema.group_dn(group)?;
        if self.find_object_by_dn(&group_dn).await?.is_none() {
            return Err(GraphError::InvalidParameter(format!(
                "Group {} does not exist ({})",
                group, group_dn
            )));
        }

        let role_dn = self.ensure_role(role, system).await?;

        let edge_dn = schema.group_in_role_dn(group, role, system)?;
        let filter = Filter::and(vec![
            Filter::equal(OBJECT_CLASS, schema.membership_object_class.as_str()),
            Filter::equal(EDGE_NAMING_ATTRIBUTE, group),
            Filter::equal(schema.membership_attribute.as_str(), group_dn.as_str()),
        ]);
        let existing = self
            .search_children(&role_dn, &filter.to_string(), NO_ATTRIBUTES)
            .await?;

        if existing.is_empty() {
            self.claim_edge(&edge_dn, group, &group_dn).await?;
        }
        Ok(edge_dn)
    }

    /// Adds a user to a global group and returns the membership DN
    pub async fn assign_user_to_global_group(&self, user: &str, group: &str) -> Result<String> {
        let schema = self.schema();
        let user_dn = schema.user_dn(user)?;
        if self.find_object_by_dn(&user_dn).await?.is_none() {
            return Err(GraphError::InvalidParameter(format!(
                "User {} does not exist ({})",
                user, user_dn
            )));
        }
        let group_dn = schema.group_dn(group)?;
        if self.find_object_by_dn(&group_dn).await?.is_none() {
            return Err(GraphError::InvalidParameter(format!(
                "Group {} does not exist ({})",
                group, group_dn
            )));
        }

        let edge_dn = schema.user_in_group_dn(user, group)?;
        self.claim_edge(&edge_dn, user, &user_dn).await?;
        Ok(edge_dn)
    }

    /// Creates the Roles container and the role when missing; returns the role DN
    async fn ensure_role(&self, role: &str, system: &str) -> Result<String> {
        let schema = self.schema();

        let roles_dn = schema.roles_dn(system)?;
        if self.find_object_by_dn(&roles_dn).await?.is_none() {
            let container = self.layout().roles_container();
            let entry = NewEntry::new(roles_dn.as_str(), CONTAINER_OBJECT_CLASS)
                .with_attribute(container.attr(), container.value());
            if self.create_if_absent(entry).await? {
                debug!(dn = %roles_dn, "Created roles container");
            }
        }

        let role_dn = schema.role_dn(role, system)?;
        if self.find_object_by_dn(&role_dn).await?.is_none() {
            let entry = NewEntry::new(role_dn.as_str(), CONTAINER_OBJECT_CLASS)
                .with_attribute(schema.group_id_attribute.as_str(), role);
            if self.create_if_absent(entry).await? {
                debug!(role = %role, system = %system, dn = %role_dn, "Created role");
            }
        }

        Ok(role_dn)
    }

    /// Makes sure an edge for `principal_dn` sits at `edge_dn`.
    ///
    /// A vacant DN gets a new edge. An occupied DN is accepted only when its
    /// member is the same principal.
    async fn claim_edge(&self, edge_dn: &str, principal: &str, principal_dn: &str) -> Result<()> {
        let schema = self.schema();
        let member_attribute = schema.membership_attribute.as_str();
        let any = Filter::any_object().to_string();

        let existing = match self.fetch(edge_dn, &any, &[member_attribute]).await? {
            Some(entry) => entry,
            None => {
                let entry = NewEntry::new(edge_dn, schema.membership_object_class.as_str())
                    .with_attribute(EDGE_NAMING_ATTRIBUTE, principal)
                    .with_attribute(member_attribute, principal_dn);
                if self.create_if_absent(entry).await? {
                    debug!(dn = %edge_dn, member = %principal_dn, "Created edge");
                    return Ok(());
                }
                // Lost a race; check what the other caller wrote
                self.fetch(edge_dn, &any, &[member_attribute])
                    .await?
                    .ok_or_else(|| {
                        GraphError::write(DirectoryError::NoSuchObject(edge_dn.to_string()))
                    })?
            }
        };

        let expected =
            Dn::new(principal_dn).map_err(|e| GraphError::Configuration(e.to_string()))?;
        let owned = existing
            .get_all(member_attribute)
            .iter()
            .any(|member| Dn::new(member).map_or(false, |dn| dn == expected));
        if owned {
            return Ok(());
        }

        Err(GraphError::InvalidParameter(format!(
            "Edge {} is already held by {}, not by {}",
            edge_dn,
            existing.get(member_attribute).unwrap_or("another entry"),
            principal_dn
        )))
    }
}
