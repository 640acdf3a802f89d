//! Configuration loading and validation
//!
//! ```toml
//! [directory]
//! host = "localhost"
//! port = 389
//! reader_dn = "uid=Searcher,dc=test"
//! reader_credentials = "notsosecret"
//!
//! [schema]
//! membership_object_class = "groupOfNames"
//! ```

use crate::error::{GraphError, Result};
use crate::schema::GraphSchema;
use dirbac_directory::AdapterConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Complete configuration: directory connection plus graph schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub directory: AdapterConfig,

    #[serde(default)]
    pub schema: GraphSchema,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GraphError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).map_err(|e| {
            GraphError::Configuration(format!("Failed to parse configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from `LDAP_*` keys, e.g. the process environment
    pub fn from_map(config: &HashMap<String, String>) -> Result<Self> {
        let directory = AdapterConfig::from_map(config).map_err(GraphError::read)?;
        let schema = GraphSchema::from_map(config)?;
        Ok(Self { directory, schema })
    }

    /// Validate both sections
    pub fn validate(&self) -> Result<()> {
        self.directory.validate().map_err(GraphError::read)?;
        self.schema.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_with_default_schema() {
        let config = AppConfig::from_toml(
            r#"
            [directory]
            host = "directory.example.com"
            reader_dn = "uid=Searcher,dc=test"
            reader_credentials = "notsosecret"
            "#,
        )
        .unwrap();

        assert_eq!(config.directory.url(), "ldap://directory.example.com:389");
        assert_eq!(config.schema, GraphSchema::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_schema() {
        let err = AppConfig::from_toml(
            r#"
            [directory]
            reader_dn = "uid=Searcher,dc=test"
            reader_credentials = "notsosecret"

            [schema]
            user_dn_template = "cn=%s,cn=%s,ou=Users,dc=test"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::Configuration(_)));
    }

    #[test]
    fn test_from_map() {
        let map: HashMap<String, String> = [
            ("LDAP_HOST", "ldap.internal"),
            ("LDAP_READER_DN", "uid=Searcher,dc=test"),
            ("LDAP_READER_CREDENTIALS", "notsosecret"),
            ("LDAP_GROUPS_CONTEXT", "ou=Teams,dc=test"),
            ("LDAP_GROUP_DN_TEMPLATE", "ou=%s,ou=Teams,dc=test"),
            ("LDAP_USER_IN_GROUP_DN_TEMPLATE", "cn=%s,ou=%s,ou=Teams,dc=test"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = AppConfig::from_map(&map).unwrap();
        assert_eq!(config.directory.host, "ldap.internal");
        assert_eq!(config.schema.group_dn("Admins").unwrap(), "ou=Admins,ou=Teams,dc=test");
    }

    #[test]
    fn test_missing_reader_is_configuration_error() {
        let err = AppConfig::from_map(&HashMap::new()).unwrap_err();
        assert!(matches!(err, GraphError::Configuration(_)));
    }
}
