use anyhow::{bail, Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OptionalExtension;
use std::path::Path;
use tracing::info;

use tweetdesk_types::ColumnInfo;

use super::schema::Schema;

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

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

        let pool = if path_str.trim().eq_ignore_ascii_case(MEMORY_DB_PATH) {
            // Every in-memory connection is a separate database, so the pool
            // must hand out the same one each time.
            Pool::builder()
                .max_size(1)
                .build(SqliteConnectionManager::memory())
        } else {
            let manager = SqliteConnectionManager::file(path.as_ref())
                .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));
            Pool::new(manager)
        }
        .context("Failed to create database connection pool")?;

        Ok(Self { pool })
    }

    /// Create an in-memory database pool (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::new(MEMORY_DB_PATH)
    }

    /// Create missing tables and upgrade older ones in place.
    ///
    /// Safe to run on every start.
    pub fn initialize(&self, schema: &Schema) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(schema.tables)
            .with_context(|| format!("Failed to initialize {} schema", schema.name))?;

        for added in schema.added_columns {
            if column_exists(&conn, added.table, added.column)? {
                continue;
            }
            conn.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    added.table, added.column, added.definition
                ),
                [],
            )
            .with_context(|| format!("Failed to add {}.{}", added.table, added.column))?;
            info!("Added column {}.{}", added.table, added.column);
        }

        for indexes in schema.indexes {
            conn.execute_batch(indexes)
                .with_context(|| format!("Failed to create {} indexes", schema.name))?;
        }

        Ok(())
    }

    /// Get a connection from the pool
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get database connection from pool")
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let conn = self.connection()?;
        table_exists(&conn, table)
    }

    /// `PRAGMA table_info` for a table that must already exist.
    pub fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let conn = self.connection()?;
        if !table_exists(&conn, table)? {
            bail!("Table '{}' does not exist", table);
        }
        table_columns(&conn, table)
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        let conn = self.connection()?;
        if !table_exists(&conn, table)? {
            bail!("Table '{}' does not exist", table);
        }
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}

pub(crate) fn table_exists(conn: &rusqlite::Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Callers must have checked `table` against `sqlite_master`.
pub(crate) fn table_columns(conn: &rusqlite::Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                type_name: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn column_exists(conn: &rusqlite::Connection, table: &str, column: &str) -> Result<bool> {
    Ok(table_columns(conn, table)?
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(column)))
}
