//! Database connection management.
//!
//! A single rusqlite Connection behind a Mutex, configured for WAL mode.
//! Repositories borrow the connection through [`Database::with_conn`].

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use docuflow_core::error::DocuflowError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
///
/// rusqlite's Connection is not Sync, so all access is serialized through a
/// Mutex; WAL mode keeps readers from blocking the writer at the file level.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path and run pending
    /// migrations.
    pub fn new(path: &Path) -> Result<Self, DocuflowError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| DocuflowError::Storage(format!("Failed to open database: {}", e)))?;
        configure(&conn)?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, DocuflowError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DocuflowError::Storage(format!("Failed to open in-memory db: {}", e)))?;
        configure(&conn)?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DocuflowError>
    where
        F: FnOnce(&Connection) -> Result<T, DocuflowError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DocuflowError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

fn configure(conn: &Connection) -> Result<(), DocuflowError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )
    .map_err(|e| DocuflowError::Storage(format!("Failed to set pragmas: {}", e)))
}

// SAFETY: all access to the inner Connection goes through Mutex::lock, so no
// two threads ever touch it concurrently; there is no other shared state.
unsafe impl Send for Database {}
unsafe impl Sync for Database {}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
