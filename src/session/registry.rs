//! Database registry
//!
//! Owns every database of the engine, authenticates users and hands out
//! sessions. A database is created the first time the admin user connects
//! to it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use super::database::Database;
use super::session::Session;
use crate::config::{ConnectionString, EngineConfig};
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Registry {
    config: Arc<EngineConfig>,
    /// Databases by lowercased name
    databases: RwLock<HashMap<String, Arc<Database>>>,
    next_session_id: AtomicU64,
}

impl Registry {
    pub fn new(config: EngineConfig) -> Self {
        info!(admin = %config.admin_user, isolation = %config.default_isolation, "registry started");
        Self {
            config: Arc::new(config),
            databases: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Database>>> {
        self.databases
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Database>>> {
        self.databases
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_admin(&self, user: &str, password: &str) -> bool {
        user.eq_ignore_ascii_case(&self.config.admin_user) && password == self.config.admin_password
    }

    /// Open a session on `database`. The admin user may connect to any
    /// database and creates it when missing; other users must have been
    /// added to an existing database.
    pub fn create_session(&self, database: &str, user: &str, password: &str) -> Result<Session> {
        let key = database.to_lowercase();
        let admin = self.is_admin(user, password);

        let existing = self.read().get(&key).cloned();
        let db = match existing {
            Some(db) if admin || db.authenticate(user, password) => db,
            None if admin => self
                .write()
                .entry(key)
                .or_insert_with(|| {
                    info!(database, "database created");
                    Arc::new(Database::new(database))
                })
                .clone(),
            _ => return Err(Error::AuthFailed(user.to_string())),
        };

        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        info!(session = id, database = %db.name(), user, "session opened");
        Ok(Session::new(id, user, db, self.config.clone()))
    }

    /// Open a session from a connection string
    pub fn connect(&self, connection_string: &str) -> Result<Session> {
        let cs = ConnectionString::parse(connection_string)?;
        self.create_session(&cs.database, &cs.user, &cs.password)
    }

    /// Allow `user` to connect to an existing database
    pub fn add_user(&self, database: &str, user: &str, password: &str) -> Result<()> {
        let db = self
            .read()
            .get(&database.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::DatabaseNotFound(database.to_string()))?;
        db.add_user(user, password);
        info!(database = %db.name(), user, "user added");
        Ok(())
    }

    /// Remove a database from the registry. Sessions already open on it
    /// keep working until they close.
    pub fn drop_database(&self, name: &str) -> Result<()> {
        self.write()
            .remove(&name.to_lowercase())
            .ok_or_else(|| Error::DatabaseNotFound(name.to_string()))?;
        info!(database = name, "database dropped");
        Ok(())
    }

    /// Names of all databases, sorted
    pub fn databases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().values().map(|db| db.name().to_string()).collect();
        names.sort();
        names
    }

    /// Forget every database
    pub fn shutdown(&self) {
        let mut databases = self.write();
        info!(count = databases.len(), "registry shut down");
        databases.clear();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_creates_database() {
        let registry = Registry::default();
        assert!(registry.databases().is_empty());
        let session = registry.create_session("Shop", "SA", "").unwrap();
        assert_eq!(session.database(), "Shop");
        assert_eq!(registry.databases(), vec!["Shop".to_string()]);

        let again = registry.create_session("shop", "sa", "").unwrap();
        assert_ne!(session.id(), again.id());
        assert_eq!(registry.databases().len(), 1);
    }

    #[test]
    fn test_unknown_user_rejected() {
        let registry = Registry::default();
        assert!(matches!(
            registry.create_session("Shop", "bob", "pw"),
            Err(Error::AuthFailed(_))
        ));
        assert!(matches!(
            registry.create_session("Shop", "sa", "wrong"),
            Err(Error::AuthFailed(_))
        ));
        assert!(matches!(
            registry.add_user("Shop", "bob", "pw"),
            Err(Error::DatabaseNotFound(_))
        ));

        registry.create_session("Shop", "sa", "").unwrap();
        registry.add_user("Shop", "bob", "pw").unwrap();
        assert!(registry.create_session("Shop", "Bob", "pw").is_ok());
        assert!(registry.create_session("Other", "bob", "pw").is_err());
    }

    #[test]
    fn test_sessions_share_database() {
        let registry = Registry::default();
        let mut a = registry.connect("Database=d;User ID=sa").unwrap();
        let mut b = registry.connect("Initial Catalog=D;UID=sa;PWD=").unwrap();
        a.execute("CREATE TABLE t (id INT)").unwrap();
        a.execute("INSERT INTO t VALUES (1)").unwrap();
        assert_eq!(b.execute("SELECT * FROM t").unwrap().rows.len(), 1);
    }

    #[test]
    fn test_drop_and_shutdown() {
        let registry = Registry::new(EngineConfig::new().admin("root", "secret"));
        registry.create_session("a", "root", "secret").unwrap();
        registry.create_session("b", "root", "secret").unwrap();
        registry.drop_database("A").unwrap();
        assert!(registry.drop_database("a").is_err());
        assert_eq!(registry.databases(), vec!["b".to_string()]);
        registry.shutdown();
        assert!(registry.databases().is_empty());
    }
}
