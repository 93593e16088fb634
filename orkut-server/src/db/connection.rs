use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use super::schema::{SCHEMA, TABLES};

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

/// Applied to every pooled connection; SQLite only enforces cascades with this on
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling support
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
}

impl Database {
    /// Create a new database connection pool
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let is_memory = path_str.trim().eq_ignore_ascii_case(MEMORY_DB_PATH);

        let manager = Self::create_connection_manager(path.as_ref(), is_memory);

        // Every connection to ":memory:" is its own database, so the pool
        // must hand out the same single connection.
        let builder = if is_memory {
            Pool::builder().max_size(1)
        } else {
            Pool::builder()
        };

        let pool = builder
            .build(manager)
            .context("Failed to create database connection pool")?;
        Ok(Self { pool })
    }

    /// Create appropriate connection manager based on path
    fn create_connection_manager(path: &Path, is_memory: bool) -> SqliteConnectionManager {
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path)
        };
        manager.with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS))
    }

    /// Create an in-memory database with the schema applied (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let db = Self::new(MEMORY_DB_PATH)?;
        db.initialize()?;
        Ok(db)
    }

    /// Initialize the database schema. Safe to run on every startup.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Row counts for every table, in schema order
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let conn = self.connection()?;
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .with_context(|| format!("Failed to count rows in {}", table))?;
            counts.push((*table, count));
        }
        Ok(counts)
    }

    /// Get a connection from the pool
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get database connection from pool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_creation() {
        let db = Database::in_memory().expect("Failed to create database");

        let conn = db.connection().expect("Failed to get connection");
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .expect("Failed to prepare statement");

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .expect("Failed to query tables")
            .collect::<Result<Vec<_>, _>>()
            .expect("Failed to collect tables");

        for table in TABLES {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Second initialize should succeed");
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = Database::in_memory().expect("Failed to create database");
        let conn = db.connection().expect("Failed to get connection");

        let enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("Failed to read pragma");
        assert_eq!(enabled, 1);

        let result = conn.execute(
            "INSERT INTO scraps (id, from_user_id, to_user_id, content, created_at)
             VALUES ('s1', 'nobody', 'nobody-else', 'hi', '2004-01-24T00:00:00Z')",
            [],
        );
        assert!(result.is_err(), "Scrap with unknown users must be rejected");
    }

    #[test]
    fn test_memory_database_detection() {
        let memory_paths = [":memory:", " :memory: ", ":MEMORY:"];

        for path in &memory_paths {
            let db = Database::new(path).expect("Failed to create memory database");
            db.initialize().expect("Failed to initialize schema");
            assert_eq!(db.pool.max_size(), 1);
        }
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("orkut.db");

        let db = Database::new(&path).expect("Failed to create file database");
        db.initialize().expect("Failed to initialize file schema");
        assert!(path.exists());

        let counts = db.table_counts().expect("Failed to count tables");
        assert_eq!(counts.len(), TABLES.len());
        assert!(counts.iter().all(|(_, count)| *count == 0));
    }
}
