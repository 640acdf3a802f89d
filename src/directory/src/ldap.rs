//! LDAP backend built on `ldap3`
//!
//! [`LdapPool`] bounds the number of borrowed connections with a semaphore and
//! keeps bound, idle connections for reuse. Connections that hit a transport
//! error are discarded on release instead of being reused.

use crate::config::AdapterConfig;
use crate::connection::{ConnectionPool, DirectoryConnection, SearchRequest, SearchScope};
use crate::entry::{DirectoryEntry, NewEntry, OBJECT_CLASS};
use crate::error::{DirectoryError, Result};
use async_trait::async_trait;
use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Scope, SearchEntry, SearchResult,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

const RC_NO_SUCH_OBJECT: u32 = 32;

/// Maps an LDAP result code to a directory error
fn from_result(result: &LdapResult) -> DirectoryError {
    let message = if result.text.is_empty() {
        format!("result-code={}", result.rc)
    } else {
        format!("result-code={}: {}", result.rc, result.text)
    };
    match result.rc {
        68 => DirectoryError::AlreadyExists(message),
        34 => DirectoryError::InvalidDn(message),
        32 => DirectoryError::NoSuchObject(message),
        17 | 21 | 64 | 65 | 67 | 69 => DirectoryError::SchemaViolation(message),
        87 => DirectoryError::InvalidFilter(message),
        _ => DirectoryError::Protocol(message),
    }
}

/// Maps an `ldap3` error; the flag is set when the connection can't be reused
fn from_ldap_error(error: LdapError) -> (DirectoryError, bool) {
    match error {
        LdapError::LdapResult { result } => (from_result(&result), false),
        LdapError::FilterParsing => (
            DirectoryError::InvalidFilter("filter could not be parsed".to_string()),
            false,
        ),
        other => (DirectoryError::Connection(other.to_string()), true),
    }
}

fn to_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Object => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

/// A bound connection borrowed from an [`LdapPool`]
pub struct LdapConnection {
    ldap: Ldap,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl LdapConnection {
    fn fail(&mut self, error: LdapError) -> DirectoryError {
        let (error, broken) = from_ldap_error(error);
        if broken {
            self.broken = true;
        }
        error
    }
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn add(&mut self, entry: &NewEntry) -> Result<()> {
        let mut attributes: Vec<(String, HashSet<String>)> =
            Vec::with_capacity(entry.attributes.len() + 1);
        attributes.push((
            OBJECT_CLASS.to_string(),
            entry.object_classes.iter().cloned().collect(),
        ));
        for (name, values) in &entry.attributes {
            attributes.push((name.clone(), values.iter().cloned().collect()));
        }

        let result = match self.ldap.add(&entry.dn, attributes).await {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e)),
        };
        if result.rc != 0 {
            return Err(from_result(&result));
        }
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        let attributes: Vec<String> = if request.attributes.is_empty() {
            vec!["*".to_string()]
        } else {
            request.attributes.clone()
        };

        let SearchResult(entries, result) = match self
            .ldap
            .search(&request.base, to_scope(request.scope), &request.filter, attributes)
            .await
        {
            Ok(found) => found,
            Err(e) => return Err(self.fail(e)),
        };

        match result.rc {
            0 => {}
            RC_NO_SUCH_OBJECT => return Ok(Vec::new()),
            _ => return Err(from_result(&result)),
        }

        Ok(entries
            .into_iter()
            .map(|raw| {
                let entry = SearchEntry::construct(raw);
                DirectoryEntry {
                    dn: entry.dn,
                    attributes: entry.attrs.into_iter().collect::<BTreeMap<_, _>>(),
                }
            })
            .collect())
    }
}

/// Bounded pool of bound LDAP connections
pub struct LdapPool {
    config: AdapterConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Ldap>>,
    closed: AtomicBool,
}

impl LdapPool {
    /// Create a pool. No connection is opened until the first acquire.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        info!(
            url = %config.url(),
            reader = %config.reader_dn,
            pool_size = config.pool_size,
            "Configured LDAP connection pool"
        );
        Ok(Self {
            permits: Arc::new(Semaphore::new(config.pool_size)),
            idle: Mutex::new(Vec::with_capacity(config.pool_size)),
            closed: AtomicBool::new(false),
            config,
        })
    }

    /// Pool configuration
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Number of idle connections kept for reuse
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Unbinds idle connections and rejects further acquires and releases
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.permits.close();
        let idle: Vec<Ldap> = std::mem::take(&mut *self.idle.lock());
        for mut ldap in idle {
            if let Err(e) = ldap.unbind().await {
                debug!(error = %e, "Unbind failed while closing pool");
            }
        }
    }

    async fn connect(&self) -> Result<Ldap> {
        let url = self.config.url();
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.connect_timeout());
        let (driver, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| DirectoryError::Connection(format!("{}: {}", url, e)))?;

        tokio::spawn(async move {
            if let Err(e) = driver.drive().await {
                warn!(error = %e, "LDAP connection driver stopped");
            }
        });

        let bind = ldap
            .simple_bind(&self.config.reader_dn, &self.config.reader_credentials)
            .await
            .map_err(|e| DirectoryError::Connection(format!("{}: {}", url, e)))?;
        if bind.rc != 0 {
            return Err(DirectoryError::Connection(format!(
                "bind as {} failed: {}",
                self.config.reader_dn,
                from_result(&bind)
            )));
        }

        debug!(url = %url, "Opened LDAP connection");
        Ok(ldap)
    }
}

#[async_trait]
impl ConnectionPool for LdapPool {
    type Connection = LdapConnection;

    async fn acquire(&self) -> Result<LdapConnection> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DirectoryError::Connection("connection pool is closed".to_string()));
        }
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DirectoryError::Connection("connection pool is closed".to_string()))?;

        let reused = self.idle.lock().pop();
        let ldap = match reused {
            Some(ldap) => ldap,
            None => self.connect().await?,
        };

        Ok(LdapConnection {
            ldap,
            broken: false,
            _permit: permit,
        })
    }

    async fn release(&self, connection: LdapConnection) -> Result<()> {
        let LdapConnection { mut ldap, broken, _permit } = connection;

        if self.closed.load(Ordering::SeqCst) {
            let _ = ldap.unbind().await;
            return Err(DirectoryError::Connection(
                "connection returned to a closed pool".to_string(),
            ));
        }

        if broken {
            debug!("Discarding broken LDAP connection");
            let _ = ldap.unbind().await;
            return Ok(());
        }

        self.idle.lock().push(ldap);
        Ok(())
    }
}
