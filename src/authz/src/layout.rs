//! Typed views of edge DNs
//!
//! Edges are located by their position below a context:
//!
//! - membership: `cn=<principal>,ou=<group>,<groups context>`
//! - participation: `cn=<principal>,ou=<role>,ou=Roles,ou=<system>,<systems context>`
//!
//! A DN that does not have this shape is a configuration error, never a
//! silently misread edge.

use crate::error::{GraphError, Result};
use crate::schema::GraphSchema;
use dirbac_directory::{Dn, Rdn};

/// A principal's membership in a global group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipEdge {
    pub principal: String,
    pub group: String,
}

/// A principal's participation in a role of a system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipationEdge {
    pub principal: String,
    pub role: String,
    pub system: String,
}

/// Parser for edge DNs, built from a schema
#[derive(Debug, Clone)]
pub struct EntryLayout {
    groups_context: Dn,
    systems_context: Dn,
    roles_container: Rdn,
}

impl EntryLayout {
    /// Derives the layout from a schema and checks that the schema's own edge
    /// templates produce DNs of the expected shape.
    pub fn new(schema: &GraphSchema) -> Result<Self> {
        let groups_context = parse_dn(&schema.groups_context)?;
        let systems_context = parse_dn(&schema.systems_context)?;

        let roles_dn = parse_dn(&schema.roles_dn("system")?)?;
        let roles_container = roles_dn.rdn().cloned().ok_or_else(|| {
            GraphError::Configuration("The roles DN template yields the root DN".to_string())
        })?;

        let layout = Self {
            groups_context,
            systems_context,
            roles_container,
        };

        for (name, dn) in [
            ("user-in-role", schema.user_in_role_dn("principal", "role", "system")?),
            ("group-in-role", schema.group_in_role_dn("principal", "role", "system")?),
        ] {
            let edge = layout.participation(&dn)?;
            if edge.role != "role" || edge.system != "system" {
                return Err(GraphError::Configuration(format!(
                    "The {} DN template does not place the role and system where expected: {}",
                    name, dn
                )));
            }
        }

        let dn = schema.user_in_group_dn("principal", "group")?;
        if layout.membership(&dn)?.group != "group" {
            return Err(GraphError::Configuration(format!(
                "The user-in-group DN template does not place the group where expected: {}",
                dn
            )));
        }

        Ok(layout)
    }

    /// Parses a membership edge DN
    pub fn membership(&self, dn: &str) -> Result<MembershipEdge> {
        let parsed = parse_dn(dn)?;
        match parsed.relative_to(&self.groups_context) {
            Some([principal, group]) => Ok(MembershipEdge {
                principal: principal.value(),
                group: group.value(),
            }),
            _ => Err(GraphError::Configuration(format!(
                "Membership entry {} is not of the form cn=<principal>,ou=<group>,{}",
                dn, self.groups_context
            ))),
        }
    }

    /// Parses a participation edge DN
    pub fn participation(&self, dn: &str) -> Result<ParticipationEdge> {
        let parsed = parse_dn(dn)?;
        match parsed.relative_to(&self.systems_context) {
            Some([principal, role, container, system]) if *container == self.roles_container => {
                Ok(ParticipationEdge {
                    principal: principal.value(),
                    role: role.value(),
                    system: system.value(),
                })
            }
            _ => Err(GraphError::Configuration(format!(
                "Participation entry {} is not of the form \
                 cn=<principal>,ou=<role>,{},ou=<system>,{}",
                dn, self.roles_container, self.systems_context
            ))),
        }
    }

    /// RDN of the Roles container below each system, `ou=Roles` by default
    pub fn roles_container(&self) -> &Rdn {
        &self.roles_container
    }
}

fn parse_dn(dn: &str) -> Result<Dn> {
    Dn::new(dn).map_err(|e| GraphError::Configuration(e.to_string()))
}
