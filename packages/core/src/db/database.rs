//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql for Quill's document store.
//!
//! # Architecture
//!
//! - **Path-agnostic**: accepts any valid `PathBuf` (user-selectable location)
//! - **Single flat table**: all documents live in one `documents` table
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **No foreign keys on `parent_id`**: a dangling parent reference is legal
//!   and must be tolerated by consumers, so the schema does not enforce one
//!
//! # Connection Patterns
//!
//! Always use `connect_with_timeout()` in async functions. The 5-second busy
//! timeout lets concurrent operations wait and retry instead of failing
//! immediately with `SQLITE_BUSY` when the Tokio runtime interleaves them.

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use quill_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("/path/to/quill.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new `DatabaseService` with the specified database path.
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (`CREATE TABLE IF NOT EXISTS`)
    /// 4. Enable WAL mode and the busy timeout
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created,
    /// the connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DatabaseError::DirectoryCreationFailed)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        tracing::info!("Database initialized at {}", service.db_path.display());

        Ok(service)
    }

    /// Get a raw connection.
    ///
    /// Only use this in synchronous, single-threaded contexts. In async
    /// functions use [`connect_with_timeout`](Self::connect_with_timeout)
    /// so concurrent operations serialize instead of failing on lock.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with the busy timeout configured.
    ///
    /// This is the safe default for all async code paths: the 5-second busy
    /// timeout makes SQLite wait and retry instead of failing immediately
    /// when another operation holds the write lock.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        Ok(conn)
    }

    /// Execute a PRAGMA statement.
    ///
    /// PRAGMA statements return rows, so we must use query() instead of
    /// execute(). This helper encapsulates that pattern.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration.
    ///
    /// Creates the table and indexes using `CREATE TABLE IF NOT EXISTS`,
    /// ensuring idempotent initialization (safe to call multiple times).
    ///
    /// # Schema
    ///
    /// - `documents` table: one row per document, flat adjacency via
    ///   `parent_id`
    /// - Indexes: parent, (parent, sort_order) sibling scans, updated_at,
    ///   deleted_at
    ///
    /// Timestamps are stored as RFC 3339 text with fixed-width microsecond
    /// precision, so lexicographic `ORDER BY` matches chronological order.
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // Enable WAL mode for better concurrency
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        // NOTE: no FOREIGN KEY on parent_id. Trashing keeps children pointing
        // at a trashed parent, and consumers must tolerate dangling parents.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                parent_id TEXT,
                emoji TEXT,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create documents table: {}", e))
        })?;

        self.create_core_indexes(&conn).await?;

        Ok(())
    }

    /// Create core indexes for the documents table.
    ///
    /// These never change, so no ALTER TABLE is ever required on user
    /// machines.
    async fn create_core_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        // Index on parent_id (hierarchy queries, descendant walks)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(parent_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_documents_parent': {}",
                e
            ))
        })?;

        // Composite index for ordered sibling scans and rank shifts
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_sibling
             ON documents(parent_id, sort_order)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_documents_sibling': {}",
                e
            ))
        })?;

        // Index on updated_at (list ordering)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(updated_at)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_documents_updated': {}",
                e
            ))
        })?;

        // Index on deleted_at (active/trashed filtering)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_deleted ON documents(deleted_at)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_documents_deleted': {}",
                e
            ))
        })?;

        Ok(())
    }
}
