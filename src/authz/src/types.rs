//! Core types for the authorization graph

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Roles per system: system name to role names
pub type EffectiveRoles = BTreeMap<String, BTreeSet<String>>;

/// A user to be created in the Users context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// User identifier, also the naming value of the user's DN
    pub id: String,

    /// Surname (required by `inetOrgPerson`)
    pub last_name: String,

    /// Given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Mail address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,

    /// Password, stored as given
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl NewUser {
    /// Create a user with only the required attributes
    pub fn new(id: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last_name: last_name.into(),
            first_name: None,
            mail: None,
            password: None,
        }
    }

    /// Set the given name
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// Set the mail address
    pub fn with_mail(mut self, mail: impl Into<String>) -> Self {
        self.mail = Some(mail.into());
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Everything a user can reach, and through which global groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAnalysis {
    /// DN of the analyzed user
    pub user_dn: String,

    /// Global groups the user belongs to
    pub groups: BTreeSet<String>,

    /// Effective roles per system, direct and inherited
    pub roles: EffectiveRoles,
}

impl AccessAnalysis {
    /// Whether the user holds `role` in `system`
    pub fn has_role(&self, system: &str, role: &str) -> bool {
        self.roles
            .get(system)
            .map(|roles| roles.contains(role))
            .unwrap_or(false)
    }
}
