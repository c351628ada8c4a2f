//! SQLite-backed store for companies, parts, BOM lines and production orders
//!
//! A [`Store`] is the data-access context: open one explicitly and pass it to
//! each operation. Every mutation runs in its own `BEGIN IMMEDIATE`
//! transaction and validates everything before the first write, so a failed
//! call leaves the database untouched. Reads that span several queries (BOM
//! snapshots, order plans) run inside one transaction so they see a
//! consistent edge set.

mod bom;
mod orders;
mod parts;
mod schema;

pub use orders::{CompletionSummary, OrderPlan, PlanLine};
pub use parts::PartFilter;

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use miette::Diagnostic;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use thiserror::Error;

use crate::bom::BomError;
use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::entities::OrderStatus;

/// Current schema version - databases with another version are refused
const SCHEMA_VERSION: i32 = 1;

/// Data-access context backed by one SQLite connection
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database of a project
    pub fn open(project: &Project) -> Result<Self, StoreError> {
        Self::open_path(&project.database_path())
    }

    /// Open (or create) a database file
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        tracing::debug!(path = %path.display(), "opened database");
        Self::prepare(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut store = Self { conn };
        match store.schema_version()? {
            None => store.init_schema()?,
            Some(SCHEMA_VERSION) => {}
            Some(found) => {
                return Err(StoreError::SchemaMismatch {
                    found,
                    expected: SCHEMA_VERSION,
                })
            }
        }
        Ok(store)
    }
}

/// Errors raised by the store
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Bom(#[from] BomError),

    #[error("database error: {0}")]
    #[diagnostic(code(forge::store::sqlite))]
    Sqlite(#[from] rusqlite::Error),

    #[error("company {code} already exists")]
    #[diagnostic(code(forge::store::duplicate_company))]
    DuplicateCompany { code: String },

    #[error("part number {part_number} already exists in company {company}")]
    #[diagnostic(code(forge::store::duplicate_part))]
    DuplicatePartNumber { company: String, part_number: String },

    #[error("order number {order_number} already exists")]
    #[diagnostic(code(forge::store::duplicate_order))]
    DuplicateOrderNumber { order_number: String },

    #[error("part {part_number} is still used in {references} BOM line(s)")]
    #[diagnostic(
        code(forge::store::part_in_use),
        help("remove those BOM lines first, or delete with --cascade")
    )]
    PartInUse {
        part_number: String,
        references: usize,
    },

    #[error("insufficient stock of {part_number}: {available} on hand, {required} required")]
    #[diagnostic(code(forge::store::insufficient_stock))]
    InsufficientStock {
        part_number: String,
        available: i64,
        required: i64,
    },

    #[error("order {order_number} cannot move from {from} to {to}")]
    #[diagnostic(code(forge::store::invalid_transition))]
    InvalidTransition {
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("database schema version {found} is not supported (expected {expected})")]
    #[diagnostic(
        code(forge::store::schema),
        help("this database was written by a different Forge version")
    )]
    SchemaMismatch { found: i32, expected: i32 },

    #[error("IO error: {0}")]
    #[diagnostic(code(forge::store::io))]
    Io(#[from] std::io::Error),
}

// =========================================================================
// Row conversion helpers
// =========================================================================

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn get_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<EntityId> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, Box::new(e)))
}

fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| conversion_error(idx, e))
}

fn get_optional_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = String>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse().map_err(|e: String| conversion_error(idx, e)))
        .transpose()
}

fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Box::new(e)))
}

fn get_optional_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, Box::new(e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory_initializes_schema() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_reopen_file_database() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("forge.db");
        {
            let mut store = Store::open_path(&path).unwrap();
            store
                .create_company(&crate::entities::Company::new("ACME", "Acme"))
                .unwrap();
        }
        let store = Store::open_path(&path).unwrap();
        assert_eq!(store.companies().unwrap().len(), 1);
    }

    #[test]
    fn test_schema_mismatch_is_refused() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("forge.db");
        drop(Store::open_path(&path).unwrap());

        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE schema_version SET version = 99", []).unwrap();
        drop(conn);

        let err = Store::open_path(&path).err().unwrap();
        assert!(matches!(err, StoreError::SchemaMismatch { found: 99, .. }));
    }
}
