//! Directory adapter configuration
//!
//! Values come either from a TOML/serde source or from a string map using the
//! `LDAP_*` keys below. Host and port have defaults; the reader identity and
//! its credentials do not.

use crate::error::{DirectoryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Directory server host name (key)
pub const LDAP_HOST: &str = "LDAP_HOST";
/// Directory server port (key)
pub const LDAP_PORT: &str = "LDAP_PORT";
/// DN used to bind for reading and writing (key)
pub const LDAP_READER_DN: &str = "LDAP_READER_DN";
/// Credentials of the reader DN (key)
pub const LDAP_READER_CREDENTIALS: &str = "LDAP_READER_CREDENTIALS";
/// Whether to connect with `ldaps://` (key)
pub const LDAP_USE_TLS: &str = "LDAP_USE_TLS";
/// Maximum number of simultaneously open connections (key)
pub const LDAP_POOL_SIZE: &str = "LDAP_POOL_SIZE";
/// Connect timeout in seconds (key)
pub const LDAP_CONNECT_TIMEOUT_SECS: &str = "LDAP_CONNECT_TIMEOUT_SECS";

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    389
}

fn default_pool_size() -> usize {
    8
}

fn default_connect_timeout_secs() -> u64 {
    5
}

/// Connection settings for a directory server
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Server host name
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// DN to bind as
    pub reader_dn: String,

    /// Credentials for `reader_dn`
    pub reader_credentials: String,

    /// Use `ldaps://` instead of `ldap://`
    #[serde(default)]
    pub use_tls: bool,

    /// Maximum number of simultaneously open connections
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl AdapterConfig {
    /// Configuration for `localhost:389` with the given bind identity
    pub fn new(reader_dn: impl Into<String>, reader_credentials: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reader_dn: reader_dn.into(),
            reader_credentials: reader_credentials.into(),
            use_tls: false,
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Builds the configuration from `LDAP_*` keys
    pub fn from_map(config: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| config.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let host = get(LDAP_HOST).map(str::to_string).unwrap_or_else(default_host);

        let port = match get(LDAP_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                DirectoryError::Configuration(format!("Illegal LDAP port \"{}\": {}", raw, e))
            })?,
            None => default_port(),
        };

        let reader_dn = get(LDAP_READER_DN)
            .ok_or_else(|| DirectoryError::Configuration("No reader DN was provided".to_string()))?
            .to_string();

        // Credentials are taken verbatim, surrounding whitespace included
        let reader_credentials = config
            .get(LDAP_READER_CREDENTIALS)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                DirectoryError::Configuration("No reader credentials were provided".to_string())
            })?
            .clone();

        let use_tls = match get(LDAP_USE_TLS) {
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                DirectoryError::Configuration(format!("Illegal {} value \"{}\"", LDAP_USE_TLS, raw))
            })?,
            None => false,
        };

        let pool_size = match get(LDAP_POOL_SIZE) {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                DirectoryError::Configuration(format!("Illegal pool size \"{}\": {}", raw, e))
            })?,
            None => default_pool_size(),
        };

        let connect_timeout_secs = match get(LDAP_CONNECT_TIMEOUT_SECS) {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                DirectoryError::Configuration(format!("Illegal connect timeout \"{}\": {}", raw, e))
            })?,
            None => default_connect_timeout_secs(),
        };

        let config = Self {
            host,
            port,
            reader_dn,
            reader_credentials,
            use_tls,
            pool_size,
            connect_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(DirectoryError::Configuration(
                "No LDAP server host was provided".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(DirectoryError::Configuration("Illegal LDAP port 0".to_string()));
        }
        if self.reader_dn.trim().is_empty() {
            return Err(DirectoryError::Configuration("No reader DN was provided".to_string()));
        }
        crate::dn::Dn::new(&self.reader_dn).map_err(|e| {
            DirectoryError::Configuration(format!("Illegal reader DN: {}", e))
        })?;
        if self.reader_credentials.is_empty() {
            return Err(DirectoryError::Configuration(
                "No reader credentials were provided".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(DirectoryError::Configuration(
                "Pool size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Server URL, e.g. `ldap://localhost:389`
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("reader_dn", &self.reader_dn)
            .field("reader_credentials", &"<redacted>")
            .field("use_tls", &self.use_tls)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_map() {
        let config = AdapterConfig::from_map(&map(&[
            (LDAP_READER_DN, "uid=Searcher,dc=test"),
            (LDAP_READER_CREDENTIALS, "notsosecret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 389);
        assert_eq!(config.url(), "ldap://localhost:389");
        assert_eq!(config.pool_size, 8);
    }

    #[test]
    fn test_overrides_from_map() {
        let config = AdapterConfig::from_map(&map(&[
            (LDAP_HOST, "directory.example.com"),
            (LDAP_PORT, "10636"),
            (LDAP_USE_TLS, "true"),
            (LDAP_POOL_SIZE, "2"),
            (LDAP_READER_DN, "uid=Searcher,dc=test"),
            (LDAP_READER_CREDENTIALS, "notsosecret"),
        ]))
        .unwrap();

        assert_eq!(config.url(), "ldaps://directory.example.com:10636");
        assert_eq!(config.pool_size, 2);
    }

    #[test]
    fn test_missing_reader_identity() {
        let err = AdapterConfig::from_map(&map(&[(LDAP_READER_CREDENTIALS, "x")])).unwrap_err();
        assert!(matches!(err, DirectoryError::Configuration(msg) if msg.contains("reader DN")));

        let err =
            AdapterConfig::from_map(&map(&[(LDAP_READER_DN, "uid=Searcher,dc=test")])).unwrap_err();
        assert!(matches!(err, DirectoryError::Configuration(msg) if msg.contains("credentials")));
    }

    #[test]
    fn test_illegal_port() {
        let err = AdapterConfig::from_map(&map(&[
            (LDAP_PORT, "three-eight-nine"),
            (LDAP_READER_DN, "uid=Searcher,dc=test"),
            (LDAP_READER_CREDENTIALS, "notsosecret"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::Configuration(msg) if msg.contains("Illegal LDAP port")
        ));
    }

    #[test]
    fn test_credentials_are_redacted() {
        let config = AdapterConfig::new("uid=Searcher,dc=test", "notsosecret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("notsosecret"));
        assert!(printed.contains("<redacted>"));
    }
}
