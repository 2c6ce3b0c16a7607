//! `DuckDB` connection pool management.
//!
//! All pooled connections are cloned from a single root connection so they
//! share one database instance and always observe each other's writes.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

/// Access mode for database connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access.
    ReadOnly,
    /// Read-write access.
    ReadWrite,
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// A `DuckDB` database file on disk.
    File(PathBuf),
    /// A private in-memory database, discarded when the last connection drops.
    InMemory,
}

impl Storage {
    /// Path of the database file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path.as_path()),
            Self::InMemory => None,
        }
    }

    /// Human-readable label used in envelopes and logs.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().into_owned(),
            Self::InMemory => String::from(":memory:"),
        }
    }
}

struct PoolState {
    read_only: Vec<Connection>,
    read_write: Vec<Connection>,
}

impl PoolState {
    fn new() -> Self {
        Self {
            read_only: Vec::new(),
            read_write: Vec::new(),
        }
    }
}

struct PoolInner {
    storage: Storage,
    max_pool_size: usize,
    root: Mutex<Connection>,
    state: Mutex<PoolState>,
}

/// A connection pool manager for `DuckDB` connections.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    /// Open the database and create a pool around it.
    ///
    /// # Arguments
    /// * `storage` - Database file or in-memory database
    /// * `max_pool_size` - Maximum number of idle connections kept per access mode
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or configured.
    pub fn open(storage: Storage, max_pool_size: usize) -> Result<Self, ::duckdb::Error> {
        let root = match &storage {
            Storage::File(path) => Connection::open(path)?,
            Storage::InMemory => Connection::open_in_memory()?,
        };
        configure_connection(&root)?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                storage,
                max_pool_size: max_pool_size.max(1),
                root: Mutex::new(root),
                state: Mutex::new(PoolState::new()),
            }),
        })
    }

    /// Acquire a connection from the pool.
    ///
    /// # Arguments
    /// * `mode` - Access mode for the connection
    ///
    /// # Errors
    /// Returns an error if a new connection cannot be cloned from the root
    /// connection.
    ///
    /// # Panics
    /// Panics if a pool mutex is poisoned (indicating a previous panic
    /// while holding the lock).
    pub fn acquire(&self, mode: AccessMode) -> Result<PooledConnection, ::duckdb::Error> {
        let mut state = self
            .inner
            .state
            .lock()
            .expect("duckdb connection pool mutex poisoned");
        let connection = match mode {
            AccessMode::ReadOnly => state.read_only.pop(),
            AccessMode::ReadWrite => state.read_write.pop(),
        };
        drop(state);

        let connection = match connection {
            Some(connection) => connection,
            None => self.clone_root()?,
        };

        Ok(PooledConnection {
            mode,
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    /// Get the storage backing this pool.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    fn clone_root(&self) -> Result<Connection, ::duckdb::Error> {
        let root = self
            .inner
            .root
            .lock()
            .expect("duckdb root connection mutex poisoned");
        let connection = root.try_clone()?;
        drop(root);
        configure_connection(&connection)?;
        Ok(connection)
    }
}

/// A pooled connection that returns to the pool when dropped.
pub struct PooledConnection {
    mode: AccessMode,
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl PooledConnection {
    /// Access mode this connection was acquired with.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection unexpectedly missing")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection unexpectedly missing")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let Ok(mut state) = self.pool.state.lock() else {
            return;
        };
        let idle = match self.mode {
            AccessMode::ReadOnly => &mut state.read_only,
            AccessMode::ReadWrite => &mut state.read_write,
        };
        if idle.len() < self.pool.max_pool_size {
            idle.push(connection);
        }
    }
}

/// Configure a database connection with appropriate settings.
///
/// `access_mode` is a database-wide startup option in `DuckDB`, so read-only
/// semantics for [`AccessMode::ReadOnly`] are enforced by the query layer.
///
/// # Errors
/// Returns an error if configuration SQL fails to execute.
fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}
