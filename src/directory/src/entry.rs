//! Directory entries as returned by searches and as submitted for creation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the attribute carrying an entry's object classes
pub const OBJECT_CLASS: &str = "objectClass";

/// An entry returned from a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry
    pub dn: String,

    /// Attribute values keyed by attribute name as reported by the server
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Create an entry without attributes
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add a value to an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of an attribute. Attribute names are matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values of an attribute, empty when absent
    pub fn get_all(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the entry carries the given object class (case-insensitive)
    pub fn has_object_class(&self, class: &str) -> bool {
        self.get_all(OBJECT_CLASS)
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }
}

/// An entry to be added to the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Distinguished name of the new entry
    pub dn: String,

    /// Object classes of the new entry
    pub object_classes: Vec<String>,

    /// Attributes other than `objectClass`, in insertion order
    pub attributes: Vec<(String, Vec<String>)>,
}

impl NewEntry {
    /// Create a new entry with a single object class
    pub fn new(dn: impl Into<String>, object_class: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            object_classes: vec![object_class.into()],
            attributes: Vec::new(),
        }
    }

    /// Add another object class
    pub fn with_object_class(mut self, object_class: impl Into<String>) -> Self {
        self.object_classes.push(object_class.into());
        self
    }

    /// Add a value to an attribute, merging with earlier values of the same attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            None => self.attributes.push((name, vec![value])),
        }
        self
    }

    /// Add an attribute only when a value is present
    pub fn with_optional_attribute(
        self,
        name: impl Into<String>,
        value: Option<impl Into<String>>,
    ) -> Self {
        match value {
            Some(value) => self.with_attribute(name, value),
            None => self,
        }
    }

    /// The entry as it would be returned from a search, object classes included
    pub fn to_directory_entry(&self) -> DirectoryEntry {
        let mut attributes = BTreeMap::new();
        attributes.insert(OBJECT_CLASS.to_string(), self.object_classes.clone());
        for (name, values) in &self.attributes {
            attributes.insert(name.clone(), values.clone());
        }
        DirectoryEntry {
            dn: self.dn.clone(),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_is_case_insensitive() {
        let entry = DirectoryEntry::new("cn=tester,ou=Users,dc=test")
            .with_attribute("objectClass", "inetOrgPerson")
            .with_attribute("uid", "tester")
            .with_attribute("mail", "tester@example.com")
            .with_attribute("mail", "t@example.com");

        assert_eq!(entry.get("UID"), Some("tester"));
        assert_eq!(entry.get_all("Mail").len(), 2);
        assert!(entry.get("sn").is_none());
        assert!(entry.get_all("sn").is_empty());
        assert!(entry.has_object_class("inetorgperson"));
    }

    #[test]
    fn test_new_entry_merges_values() {
        let entry = NewEntry::new(
            "ou=Auditor,ou=Roles,ou=Datastore,ou=Systems,dc=test",
            "organizationalUnit",
        )
        .with_attribute("ou", "Auditor")
        .with_attribute("OU", "Auditor")
        .with_attribute("description", "Read-only access")
        .with_optional_attribute("seeAlso", None::<String>);

        assert_eq!(entry.attributes.len(), 2);
        assert_eq!(entry.attributes[0], ("ou".to_string(), vec!["Auditor".to_string()]));

        let found = entry.to_directory_entry();
        assert!(found.has_object_class("organizationalUnit"));
        assert_eq!(found.get("description"), Some("Read-only access"));
    }
}
