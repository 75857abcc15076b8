use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// `Local` entries persist until removed. `Session` entries carry one-shot
/// messages between two steps of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    Local,
    Session,
}

impl StorageScope {
    fn table(self) -> &'static str {
        match self {
            Self::Local => "local_storage",
            Self::Session => "session_storage",
        }
    }
}

pub trait ClientStorage: Send + Sync {
    fn get_item(&self, scope: StorageScope, key: &str) -> Result<Option<String>, InfraError>;
    fn set_item(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), InfraError>;
    fn remove_item(&self, scope: StorageScope, key: &str) -> Result<(), InfraError>;

    /// Reads an entry and removes it, so it is observed at most once.
    fn take_item(&self, scope: StorageScope, key: &str) -> Result<Option<String>, InfraError> {
        let value = self.get_item(scope, key)?;
        if value.is_some() {
            self.remove_item(scope, key)?;
        }
        Ok(value)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteClientStorage {
    db_path: PathBuf,
}

impl SqliteClientStorage {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl ClientStorage for SqliteClientStorage {
    fn get_item(&self, scope: StorageScope, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", scope.table()),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            &format!(
                "INSERT INTO {} (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                scope.table()
            ),
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_item(&self, scope: StorageScope, key: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            &format!("DELETE FROM {} WHERE key = ?1", scope.table()),
            params![key],
        )?;
        Ok(())
    }

    fn take_item(&self, scope: StorageScope, key: &str) -> Result<Option<String>, InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        let value: Option<String> = transaction
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", scope.table()),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if value.is_some() {
            transaction.execute(
                &format!("DELETE FROM {} WHERE key = ?1", scope.table()),
                params![key],
            )?;
        }
        transaction.commit()?;
        Ok(value)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryClientStorage {
    entries: Mutex<HashMap<(StorageScope, String), String>>,
}

impl InMemoryClientStorage {
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(StorageScope, String), String>>, InfraError> {
        self.entries
            .lock()
            .map_err(|error| InfraError::Storage(format!("in-memory lock poisoned: {error}")))
    }
}

impl ClientStorage for InMemoryClientStorage {
    fn get_item(&self, scope: StorageScope, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self.lock()?.get(&(scope, key.to_string())).cloned())
    }

    fn set_item(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), InfraError> {
        self.lock()?
            .insert((scope, key.to_string()), value.to_string());
        Ok(())
    }

    fn remove_item(&self, scope: StorageScope, key: &str) -> Result<(), InfraError> {
        self.lock()?.remove(&(scope, key.to_string()));
        Ok(())
    }

    fn take_item(&self, scope: StorageScope, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self.lock()?.remove(&(scope, key.to_string())))
    }
}
