//! Effective access analysis
//!
//! A user's effective roles are the union of
//!
//! 1. roles the user participates in directly, and
//! 2. roles granted to any global group the user is a member of.
//!
//! Group nesting is not followed: only groups holding a membership edge for
//! the user itself count. Everything is computed from live searches.

use crate::error::{GraphError, Result};
use crate::graph::{AuthzGraph, NO_ATTRIBUTES};
use crate::types::{AccessAnalysis, EffectiveRoles};
use dirbac_directory::{ConnectionPool, Filter, OBJECT_CLASS};
use std::collections::BTreeSet;
use tracing::{debug, trace};

impl<P: ConnectionPool> AuthzGraph<P> {
    /// Roles per system reachable by the user, directly or through a global group.
    /// Systems where the user has no role are absent.
    pub async fn groups_and_roles_analysis(&self, user: &str) -> Result<EffectiveRoles> {
        Ok(self.analyze_user(user).await?.roles)
    }

    /// Full analysis: the user's DN, global groups and effective roles
    pub async fn analyze_user(&self, user: &str) -> Result<AccessAnalysis> {
        let schema = self.schema();
        let user_dn = self
            .find_user_dn(user)
            .await?
            .ok_or_else(|| GraphError::InvalidParameter(format!("User {} does not exist", user)))?;

        let membership_class =
            || Filter::equal(OBJECT_CLASS, schema.membership_object_class.as_str());
        let member = |dn: &str| Filter::equal(schema.membership_attribute.as_str(), dn);

        let direct = Filter::and(vec![membership_class(), member(&user_dn)]).to_string();

        let mut groups = BTreeSet::new();
        for entry in self
            .search_subtree(&schema.groups_context, &direct, NO_ATTRIBUTES)
            .await?
        {
            let edge = self.layout().membership(&entry.dn)?;
            trace!(user = %user, group = %edge.group, "Found global group membership");
            groups.insert(edge.group);
        }

        let mut roles = EffectiveRoles::new();
        for entry in self
            .search_subtree(&schema.systems_context, &direct, NO_ATTRIBUTES)
            .await?
        {
            let edge = self.layout().participation(&entry.dn)?;
            trace!(
                user = %user,
                system = %edge.system,
                role = %edge.role,
                "Found direct role participation"
            );
            roles.entry(edge.system).or_default().insert(edge.role);
        }

        if !groups.is_empty() {
            let members = groups
                .iter()
                .map(|group| schema.group_dn(group).map(|dn| member(&dn)))
                .collect::<Result<Vec<_>>>()?;
            let inherited = Filter::and(vec![membership_class(), Filter::or(members)]).to_string();

            for entry in self
                .search_subtree(&schema.systems_context, &inherited, NO_ATTRIBUTES)
                .await?
            {
                let edge = self.layout().participation(&entry.dn)?;
                trace!(
                    user = %user,
                    group = %edge.principal,
                    system = %edge.system,
                    role = %edge.role,
                    "Found role participation through global group"
                );
                roles.entry(edge.system).or_default().insert(edge.role);
            }
        }

        debug!(
            user = %user,
            groups = groups.len(),
            systems = roles.len(),
            "Analyzed effective access"
        );
        Ok(AccessAnalysis {
            user_dn,
            groups,
            roles,
        })
    }
}
