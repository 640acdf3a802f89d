//! Graph schema: where entries live and what they look like
//!
//! The schema names the three contexts (Users, Groups, Systems), the DN
//! templates for every entity and edge, the object classes and attribute
//! names written to the directory, and the filters used for enumeration.
//! Every value has a default matching the layout
//!
//! ```text
//! dc=test
//!  ├─ ou=Users    → cn=<userId>
//!  ├─ ou=Groups   → ou=<groupId> → cn=<principalId>
//!  └─ ou=Systems  → ou=<system> → ou=Roles → ou=<roleId> → cn=<principalId>
//! ```
//!
//! and can be overridden through TOML or through `LDAP_*` string keys. A
//! schema is validated once, when it is built.

use crate::error::{GraphError, Result};
use crate::template::{compose, marker_count};
use dirbac_directory::{Dn, Filter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// String keys accepted by [`GraphSchema::from_map`]
pub mod keys {
    pub const USERS_CONTEXT: &str = "LDAP_USERS_CONTEXT";
    pub const GROUPS_CONTEXT: &str = "LDAP_GROUPS_CONTEXT";
    pub const SYSTEMS_CONTEXT: &str = "LDAP_SYSTEMS_CONTEXT";
    pub const SYSTEM_DN_TEMPLATE: &str = "LDAP_SYSTEM_DN_TEMPLATE";
    pub const ROLES_DN_TEMPLATE: &str = "LDAP_ROLES_DN_TEMPLATE";
    pub const ROLE_DN_TEMPLATE: &str = "LDAP_ROLE_DN_TEMPLATE";
    pub const USER_DN_TEMPLATE: &str = "LDAP_USER_DN_TEMPLATE";
    pub const GROUP_DN_TEMPLATE: &str = "LDAP_GROUP_DN_TEMPLATE";
    pub const USER_IN_ROLE_DN_TEMPLATE: &str = "LDAP_USER_IN_ROLE_DN_TEMPLATE";
    pub const GROUP_IN_ROLE_DN_TEMPLATE: &str = "LDAP_GROUP_IN_ROLE_DN_TEMPLATE";
    pub const USER_IN_GROUP_DN_TEMPLATE: &str = "LDAP_USER_IN_GROUP_DN_TEMPLATE";
    pub const USER_OBJECT_CLASS: &str = "LDAP_USER_OBJECT_CLASS";
    pub const MEMBERSHIP_OBJECT_CLASS: &str = "LDAP_MEMBERSHIP_OBJECTCLASS";
    pub const USER_ID: &str = "LDAP_USER_ID";
    pub const USER_PASSWORD: &str = "LDAP_USER_PASSWORD";
    pub const USER_FIRST_NAME: &str = "LDAP_USER_FIRST_NAME";
    pub const USER_LAST_NAME: &str = "LDAP_USER_LAST_NAME";
    pub const USER_MAIL: &str = "LDAP_USER_MAIL";
    pub const GROUP_ID: &str = "LDAP_GROUP_ID";
    pub const GROUP_DESCRIPTION: &str = "LDAP_GROUP_DESCRIPTION";
    pub const MEMBERSHIP_ATTRIBUTE: &str = "LDAP_MEMBERSHIP_ATTRIBUTE";
    pub const SYSTEM_NAME_ATTRIBUTE: &str = "LDAP_SYSTEM_NAME_ATTRIBUTE";
    pub const USER_SEARCH_FILTER: &str = "LDAP_USER_SEARCH_FILTER";
    pub const GROUP_SEARCH_FILTER: &str = "LDAP_GROUP_SEARCH_FILTER";
    pub const ROLE_SEARCH_FILTER: &str = "LDAP_ROLE_SEARCH_FILTER";
    pub const SYSTEM_SEARCH_FILTER: &str = "LDAP_SYSTEM_SEARCH_FILTER";
}

/// Object class of containers (Systems, Roles containers, Roles, Groups)
pub const CONTAINER_OBJECT_CLASS: &str = "organizationalUnit";

/// Naming attribute of membership and participation edges
pub const EDGE_NAMING_ATTRIBUTE: &str = "cn";

/// Directory layout of the authorization graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSchema {
    /// Container of user entries
    pub users_context: String,
    /// Container of global groups
    pub groups_context: String,
    /// Container of systems
    pub systems_context: String,

    /// `ou=%s,...`: system name
    pub system_dn_template: String,
    /// Roles container of a system: system name
    pub roles_dn_template: String,
    /// Role: role id, system name
    pub role_dn_template: String,
    /// User: user id
    pub user_dn_template: String,
    /// Global group: group id
    pub group_dn_template: String,
    /// User participation in a role: user id, role id, system name
    pub user_in_role_dn_template: String,
    /// Group participation in a role: group id, role id, system name.
    /// Falls back to `user_in_role_dn_template` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_in_role_dn_template: Option<String>,
    /// User membership in a global group: user id, group id
    pub user_in_group_dn_template: String,

    pub user_object_class: String,
    pub membership_object_class: String,

    pub user_id_attribute: String,
    pub user_password_attribute: String,
    pub user_first_name_attribute: String,
    pub user_last_name_attribute: String,
    pub user_mail_attribute: String,
    pub group_id_attribute: String,
    pub group_description_attribute: String,
    pub membership_attribute: String,
    pub system_name_attribute: String,

    pub user_search_filter: String,
    pub group_search_filter: String,
    pub role_search_filter: String,
    pub system_search_filter: String,
}

impl Default for GraphSchema {
    fn default() -> Self {
        Self {
            users_context: "ou=Users,dc=test".to_string(),
            groups_context: "ou=Groups,dc=test".to_string(),
            systems_context: "ou=Systems,dc=test".to_string(),

            system_dn_template: "ou=%s,ou=Systems,dc=test".to_string(),
            roles_dn_template: "ou=Roles,ou=%s,ou=Systems,dc=test".to_string(),
            role_dn_template: "ou=%s,ou=Roles,ou=%s,ou=Systems,dc=test".to_string(),
            user_dn_template: "cn=%s,ou=Users,dc=test".to_string(),
            group_dn_template: "ou=%s,ou=Groups,dc=test".to_string(),
            user_in_role_dn_template: "cn=%s,ou=%s,ou=Roles,ou=%s,ou=Systems,dc=test".to_string(),
            group_in_role_dn_template: None,
            user_in_group_dn_template: "cn=%s,ou=%s,ou=Groups,dc=test".to_string(),

            user_object_class: "inetOrgPerson".to_string(),
            membership_object_class: "groupOfNames".to_string(),

            user_id_attribute: "uid".to_string(),
            user_password_attribute: "userPassword".to_string(),
            user_first_name_attribute: "givenName".to_string(),
            user_last_name_attribute: "sn".to_string(),
            user_mail_attribute: "mail".to_string(),
            group_id_attribute: "ou".to_string(),
            group_description_attribute: "description".to_string(),
            membership_attribute: "member".to_string(),
            system_name_attribute: "ou".to_string(),

            user_search_filter: "(cn=*)".to_string(),
            group_search_filter: "(ou=*)".to_string(),
            role_search_filter: "(ou=*)".to_string(),
            system_search_filter: "(ou=*)".to_string(),
        }
    }
}

impl GraphSchema {
    /// Default schema, validated
    pub fn new() -> Result<Self> {
        let schema = Self::default();
        schema.validate()?;
        Ok(schema)
    }

    /// Builds a schema from `LDAP_*` keys; absent or blank keys keep their defaults
    pub fn from_map(config: &HashMap<String, String>) -> Result<Self> {
        let lookup = |key: &str| {
            config
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut schema = Self::default();
        for (key, field) in schema.string_fields_mut() {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }
        if let Some(value) = lookup(keys::GROUP_IN_ROLE_DN_TEMPLATE) {
            schema.group_in_role_dn_template = Some(value);
        }

        schema.validate()?;
        Ok(schema)
    }

    fn string_fields_mut(&mut self) -> [(&'static str, &mut String); 25] {
        [
            (keys::USERS_CONTEXT, &mut self.users_context),
            (keys::GROUPS_CONTEXT, &mut self.groups_context),
            (keys::SYSTEMS_CONTEXT, &mut self.systems_context),
            (keys::SYSTEM_DN_TEMPLATE, &mut self.system_dn_template),
            (keys::ROLES_DN_TEMPLATE, &mut self.roles_dn_template),
            (keys::ROLE_DN_TEMPLATE, &mut self.role_dn_template),
            (keys::USER_DN_TEMPLATE, &mut self.user_dn_template),
            (keys::GROUP_DN_TEMPLATE, &mut self.group_dn_template),
            (keys::USER_IN_ROLE_DN_TEMPLATE, &mut self.user_in_role_dn_template),
            (keys::USER_IN_GROUP_DN_TEMPLATE, &mut self.user_in_group_dn_template),
            (keys::USER_OBJECT_CLASS, &mut self.user_object_class),
            (keys::MEMBERSHIP_OBJECT_CLASS, &mut self.membership_object_class),
            (keys::USER_ID, &mut self.user_id_attribute),
            (keys::USER_PASSWORD, &mut self.user_password_attribute),
            (keys::USER_FIRST_NAME, &mut self.user_first_name_attribute),
            (keys::USER_LAST_NAME, &mut self.user_last_name_attribute),
            (keys::USER_MAIL, &mut self.user_mail_attribute),
            (keys::GROUP_ID, &mut self.group_id_attribute),
            (keys::GROUP_DESCRIPTION, &mut self.group_description_attribute),
            (keys::MEMBERSHIP_ATTRIBUTE, &mut self.membership_attribute),
            (keys::SYSTEM_NAME_ATTRIBUTE, &mut self.system_name_attribute),
            (keys::USER_SEARCH_FILTER, &mut self.user_search_filter),
            (keys::GROUP_SEARCH_FILTER, &mut self.group_search_filter),
            (keys::ROLE_SEARCH_FILTER, &mut self.role_search_filter),
            (keys::SYSTEM_SEARCH_FILTER, &mut self.system_search_filter),
        ]
    }

    /// Checks contexts, templates, names and filters
    pub fn validate(&self) -> Result<()> {
        for (name, context) in [
            ("users context", &self.users_context),
            ("groups context", &self.groups_context),
            ("systems context", &self.systems_context),
        ] {
            let dn = Dn::new(context)
                .map_err(|e| GraphError::Configuration(format!("Illegal {}: {}", name, e)))?;
            if dn.is_root() {
                return Err(GraphError::Configuration(format!("No {} was provided", name)));
            }
        }

        for (name, template, markers) in [
            ("system DN template", self.system_dn_template.as_str(), 1),
            ("roles DN template", self.roles_dn_template.as_str(), 1),
            ("role DN template", self.role_dn_template.as_str(), 2),
            ("user DN template", self.user_dn_template.as_str(), 1),
            ("group DN template", self.group_dn_template.as_str(), 1),
            ("user-in-role DN template", self.user_in_role_dn_template.as_str(), 3),
            ("group-in-role DN template", self.group_in_role_template(), 3),
            ("user-in-group DN template", self.user_in_group_dn_template.as_str(), 2),
        ] {
            check_template(name, template, markers)?;
        }

        for (name, value) in [
            ("user object class", &self.user_object_class),
            ("membership object class", &self.membership_object_class),
            ("user id attribute", &self.user_id_attribute),
            ("user password attribute", &self.user_password_attribute),
            ("user first name attribute", &self.user_first_name_attribute),
            ("user last name attribute", &self.user_last_name_attribute),
            ("user mail attribute", &self.user_mail_attribute),
            ("group id attribute", &self.group_id_attribute),
            ("group description attribute", &self.group_description_attribute),
            ("membership attribute", &self.membership_attribute),
            ("system name attribute", &self.system_name_attribute),
        ] {
            if value.trim().is_empty() {
                return Err(GraphError::Configuration(format!("No {} was provided", name)));
            }
        }

        for (name, filter) in [
            ("user search filter", &self.user_search_filter),
            ("group search filter", &self.group_search_filter),
            ("role search filter", &self.role_search_filter),
            ("system search filter", &self.system_search_filter),
        ] {
            Filter::parse(filter)
                .map_err(|e| GraphError::Configuration(format!("Illegal {}: {}", name, e)))?;
        }

        Ok(())
    }

    /// Template for group participation edges, user participation when unset
    pub fn group_in_role_template(&self) -> &str {
        self.group_in_role_dn_template
            .as_deref()
            .unwrap_or(&self.user_in_role_dn_template)
    }

    /// DN of a system
    pub fn system_dn(&self, system: &str) -> Result<String> {
        compose(&self.system_dn_template, &[system])
    }

    /// DN of the Roles container of a system
    pub fn roles_dn(&self, system: &str) -> Result<String> {
        compose(&self.roles_dn_template, &[system])
    }

    /// DN of a role within a system
    pub fn role_dn(&self, role: &str, system: &str) -> Result<String> {
        compose(&self.role_dn_template, &[role, system])
    }

    /// DN of a user
    pub fn user_dn(&self, user: &str) -> Result<String> {
        compose(&self.user_dn_template, &[user])
    }

    /// DN of a global group
    pub fn group_dn(&self, group: &str) -> Result<String> {
        compose(&self.group_dn_template, &[group])
    }

    /// DN of a user's participation edge below a role
    pub fn user_in_role_dn(&self, user: &str, role: &str, system: &str) -> Result<String> {
        compose(&self.user_in_role_dn_template, &[user, role, system])
    }

    /// DN of a group's participation edge below a role
    pub fn group_in_role_dn(&self, group: &str, role: &str, system: &str) -> Result<String> {
        compose(self.group_in_role_template(), &[group, role, system])
    }

    /// DN of a user's membership edge below a global group
    pub fn user_in_group_dn(&self, user: &str, group: &str) -> Result<String> {
        compose(&self.user_in_group_dn_template, &[user, group])
    }
}

fn check_template(name: &str, template: &str, markers: usize) -> Result<()> {
    let found = marker_count(template);
    if found != markers {
        return Err(GraphError::Configuration(format!(
            "The {} \"{}\" needs {} marker(s), found {}",
            name, template, markers, found
        )));
    }

    let sample = vec!["x"; markers];
    let dn = compose(template, &sample)?;
    Dn::new(&dn).map_err(|e| {
        GraphError::Configuration(format!("The {} \"{}\" is not a DN: {}", name, template, e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_valid() {
        let schema = GraphSchema::new().unwrap();
        assert_eq!(schema.system_dn("Datastore").unwrap(), "ou=Datastore,ou=Systems,dc=test");
        assert_eq!(
            schema.roles_dn("Datastore").unwrap(),
            "ou=Roles,ou=Datastore,ou=Systems,dc=test"
        );
        assert_eq!(
            schema.role_dn("Auditor", "Datastore").unwrap(),
            "ou=Auditor,ou=Roles,ou=Datastore,ou=Systems,dc=test"
        );
        assert_eq!(schema.user_dn("tester").unwrap(), "cn=tester,ou=Users,dc=test");
        assert_eq!(
            schema.user_in_group_dn("tester", "Administrators").unwrap(),
            "cn=tester,ou=Administrators,ou=Groups,dc=test"
        );
    }

    #[test]
    fn test_group_in_role_falls_back_to_user_in_role() {
        let mut schema = GraphSchema::default();
        assert_eq!(
            schema.group_in_role_dn("Administrators", "Auditor", "Datastore").unwrap(),
            schema.user_in_role_dn("Administrators", "Auditor", "Datastore").unwrap()
        );

        schema.group_in_role_dn_template =
            Some("cn=group-%s,ou=%s,ou=Roles,ou=%s,ou=Systems,dc=test".to_string());
        assert_eq!(
            schema.group_in_role_dn("Administrators", "Auditor", "Datastore").unwrap(),
            "cn=group-Administrators,ou=Auditor,ou=Roles,ou=Datastore,ou=Systems,dc=test"
        );
    }

    #[test]
    fn test_from_map_overrides() {
        let mut map = HashMap::new();
        map.insert(keys::USERS_CONTEXT.to_string(), "ou=People,dc=example".to_string());
        map.insert(keys::USER_DN_TEMPLATE.to_string(), "cn=%s,ou=People,dc=example".to_string());
        map.insert(keys::MEMBERSHIP_OBJECT_CLASS.to_string(), "groupOfUniqueNames".to_string());
        map.insert(keys::MEMBERSHIP_ATTRIBUTE.to_string(), "  ".to_string());

        let schema = GraphSchema::from_map(&map).unwrap();
        assert_eq!(schema.users_context, "ou=People,dc=example");
        assert_eq!(schema.user_dn("tester").unwrap(), "cn=tester,ou=People,dc=example");
        assert_eq!(schema.membership_object_class, "groupOfUniqueNames");
        assert_eq!(schema.membership_attribute, "member");
    }

    #[test]
    fn test_marker_mismatch_rejected() {
        let mut map = HashMap::new();
        map.insert(
            keys::ROLE_DN_TEMPLATE.to_string(),
            "ou=%s,ou=Roles,ou=Systems,dc=test".to_string(),
        );

        let err = GraphSchema::from_map(&map).unwrap_err();
        assert!(matches!(err, GraphError::Configuration(msg) if msg.contains("role DN template")));
    }

    #[test]
    fn test_invalid_context_rejected() {
        let mut schema = GraphSchema::default();
        schema.groups_context = "Groups".to_string();
        assert!(matches!(schema.validate(), Err(GraphError::Configuration(_))));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let mut schema = GraphSchema::default();
        schema.role_search_filter = "(ou=*".to_string();
        assert!(matches!(schema.validate(), Err(GraphError::Configuration(_))));
    }

    #[test]
    fn test_deserializes_partial_toml() {
        let schema: GraphSchema = toml::from_str(
            r#"
            membership_object_class = "groupOfUniqueNames"
            group_in_role_dn_template = "cn=%s,ou=%s,ou=Roles,ou=%s,ou=Systems,dc=test"
            "#,
        )
        .unwrap();

        assert_eq!(schema.membership_object_class, "groupOfUniqueNames");
        assert_eq!(schema.users_context, "ou=Users,dc=test");
        assert!(schema.group_in_role_dn_template.is_some());
        schema.validate().unwrap();
    }
}
