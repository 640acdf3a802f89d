//! Read path: existence checks and enumerations

use crate::error::Result;
use crate::graph::{leading_value, AuthzGraph, NO_ATTRIBUTES};
use crate::schema::EDGE_NAMING_ATTRIBUTE;
use crate::template::compose;
use dirbac_directory::{ConnectionPool, DirectoryEntry, Filter, OBJECT_CLASS};
use std::collections::BTreeSet;

impl<P: ConnectionPool> AuthzGraph<P> {
    /// The DN if an entry exists there, `None` otherwise
    pub async fn find_object_by_dn(&self, dn: &str) -> Result<Option<String>> {
        let found = self
            .search_one(dn, &Filter::any_object().to_string())
            .await?;
        Ok(found.map(|entry| entry.dn))
    }

    /// Whether a global group with this name exists
    pub async fn global_group_exists(&self, group: &str) -> Result<bool> {
        let dn = self.schema().group_dn(group)?;
        Ok(self.find_object_by_dn(&dn).await?.is_some())
    }

    /// Whether a system with this name exists
    pub async fn system_exists(&self, system: &str) -> Result<bool> {
        let dn = self.schema().system_dn(system)?;
        Ok(self.find_object_by_dn(&dn).await?.is_some())
    }

    /// Whether the user is a member of the group. `group` is either a group
    /// name or the DN of the group entry.
    pub async fn is_member_of_global_group(&self, user: &str, group: &str) -> Result<bool> {
        let dn = if is_group_dn(group) {
            compose("cn=%s,%s", &[user, group])?
        } else {
            self.schema().user_in_group_dn(user, group)?
        };
        Ok(self.find_object_by_dn(&dn).await?.is_some())
    }

    /// Ids of the principals with a membership edge below the group.
    /// `group` is either a group name or the DN of the group entry.
    pub async fn get_users_in_global_group(&self, group: &str) -> Result<BTreeSet<String>> {
        let base = if is_group_dn(group) {
            group.to_string()
        } else {
            self.schema().group_dn(group)?
        };
        self.edge_principals(&base).await
    }

    /// Ids of the principals with a participation edge below the role
    pub async fn get_users_in_role(&self, role: &str, system: &str) -> Result<BTreeSet<String>> {
        let base = self.schema().role_dn(role, system)?;
        self.edge_principals(&base).await
    }

    /// Names of all global groups
    pub async fn get_global_groups(&self) -> Result<BTreeSet<String>> {
        let schema = self.schema();
        let entries = self
            .search_children(
                &schema.groups_context,
                &schema.group_search_filter,
                &[schema.group_id_attribute.as_str()],
            )
            .await?;
        names(entries, &schema.group_id_attribute)
    }

    /// Names of all systems
    pub async fn get_systems(&self) -> Result<BTreeSet<String>> {
        let schema = self.schema();
        let entries = self
            .search_children(
                &schema.systems_context,
                &schema.system_search_filter,
                &[schema.system_name_attribute.as_str()],
            )
            .await?;
        names(entries, &schema.system_name_attribute)
    }

    /// Names of the roles defined in a system
    pub async fn get_roles_in_system(&self, system: &str) -> Result<BTreeSet<String>> {
        let schema = self.schema();
        let base = schema.roles_dn(system)?;
        self.search_children(&base, &schema.role_search_filter, NO_ATTRIBUTES)
            .await?
            .iter()
            .map(|entry| leading_value(&entry.dn))
            .collect()
    }

    /// DN of the user whose id attribute equals `user`
    pub async fn find_user_dn(&self, user: &str) -> Result<Option<String>> {
        let schema = self.schema();
        let filter = Filter::and(vec![
            Filter::equal(OBJECT_CLASS, schema.user_object_class.as_str()),
            Filter::equal(schema.user_id_attribute.as_str(), user),
        ]);
        let found = self
            .search_children(&schema.users_context, &filter.to_string(), NO_ATTRIBUTES)
            .await?;
        Ok(found.into_iter().next().map(|entry| entry.dn))
    }

    /// Ids of all users
    pub async fn get_users(&self) -> Result<BTreeSet<String>> {
        let schema = self.schema();
        let entries = self
            .search_children(
                &schema.users_context,
                &schema.user_search_filter,
                &[schema.user_id_attribute.as_str()],
            )
            .await?;
        names(entries, &schema.user_id_attribute)
    }

    /// `cn` of every membership-class child of `base`
    async fn edge_principals(&self, base: &str) -> Result<BTreeSet<String>> {
        let filter = Filter::equal(OBJECT_CLASS, self.schema().membership_object_class.as_str());
        let entries = self
            .search_children(base, &filter.to_string(), &[EDGE_NAMING_ATTRIBUTE])
            .await?;
        names(entries, EDGE_NAMING_ATTRIBUTE)
    }
}

fn is_group_dn(group: &str) -> bool {
    group
        .get(..3)
        .map(|prefix| prefix.eq_ignore_ascii_case("ou="))
        .unwrap_or(false)
}

/// Values of `attribute`, falling back to the leading RDN value when an entry lacks it
fn names(entries: Vec<DirectoryEntry>, attribute: &str) -> Result<BTreeSet<String>> {
    entries
        .into_iter()
        .map(|entry| match entry.get(attribute) {
            Some(value) => Ok(value.to_string()),
            None => leading_value(&entry.dn),
        })
        .collect()
}
