mod from_row;
pub mod queries;
pub mod schema;

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::error::Result;

pub use schema::{EXPECTED_INDEXES, EXPECTED_TABLES, SCHEMA_SQL};

pub type DbPool = Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection settings. SQLite only enforces foreign keys when the
/// pragma is set on the connection doing the write.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

/// Open a pool on a database file. Each connection is configured when the
/// pool opens it.
pub fn create_pool(path: &str, max_size: u32) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|c| configure_connection(c));
    let pool = Pool::builder().max_size(max_size).build(manager)?;
    Ok(pool)
}

/// Create any missing tables and indexes. Existing data is left alone.
pub fn init_db(conn: &Connection) -> Result<()> {
    configure_connection(conn)?;
    conn.execute_batch(SCHEMA_SQL)?;
    tracing::debug!("Schema applied");
    Ok(())
}

/// What `verify_schema` found missing. Columns are reported as `table.column`
/// and only for tables that exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    pub missing_tables: Vec<String>,
    pub missing_columns: Vec<String>,
    pub missing_indexes: Vec<String>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.missing_tables.is_empty()
            && self.missing_columns.is_empty()
            && self.missing_indexes.is_empty()
    }
}

/// Compare the database against the expected tables, columns and indexes.
pub fn verify_schema(conn: &Connection) -> Result<SchemaReport> {
    let mut report = SchemaReport::default();

    for (table, columns) in EXPECTED_TABLES {
        let existing: Vec<String> = {
            let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
            stmt.query_map([table], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        if existing.is_empty() {
            report.missing_tables.push(table.to_string());
            continue;
        }

        for column in columns.iter() {
            if !existing.iter().any(|c| c == column) {
                report.missing_columns.push(format!("{}.{}", table, column));
            }
        }
    }

    for (index, table) in EXPECTED_INDEXES {
        let found: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1 AND tbl_name = ?2",
            params![index, table],
            |row| row.get(0),
        )?;
        if found == 0 {
            report.missing_indexes.push(index.to_string());
        }
    }

    Ok(report)
}
