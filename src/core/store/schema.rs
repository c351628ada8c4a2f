//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::{Store, StoreError, SCHEMA_VERSION};

impl Store {
    /// Version recorded in the database, `None` for a fresh database
    pub(super) fn schema_version(&self) -> Result<Option<i32>, StoreError> {
        let has_table: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        if !has_table {
            return Ok(None);
        }
        let version = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(version)
    }

    /// Initialize database schema
    pub(super) fn init_schema(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Tenancy boundary
            CREATE TABLE IF NOT EXISTS companies (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                created TEXT NOT NULL
            );

            -- Parts inventory
            CREATE TABLE IF NOT EXISTS parts (
                id TEXT PRIMARY KEY,
                company_id TEXT NOT NULL REFERENCES companies(id),
                part_number TEXT NOT NULL,
                name TEXT NOT NULL,
                part_type TEXT NOT NULL,
                material_type TEXT,
                stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
                reorder_level INTEGER NOT NULL DEFAULT 0,
                unit TEXT NOT NULL,
                unit_cost REAL,
                description TEXT,
                created TEXT NOT NULL,
                UNIQUE (company_id, part_number)
            );
            CREATE INDEX IF NOT EXISTS idx_parts_company ON parts(company_id);
            CREATE INDEX IF NOT EXISTS idx_parts_type ON parts(part_type);

            -- BOM edges: parent part requires quantity of component part
            CREATE TABLE IF NOT EXISTS bom_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                part_id TEXT NOT NULL REFERENCES parts(id),
                component_part_id TEXT NOT NULL REFERENCES parts(id),
                quantity REAL NOT NULL CHECK (quantity > 0),
                unit TEXT NOT NULL,
                UNIQUE (part_id, component_part_id),
                CHECK (part_id <> component_part_id)
            );
            CREATE INDEX IF NOT EXISTS idx_bom_items_component ON bom_items(component_part_id);

            -- Production orders
            CREATE TABLE IF NOT EXISTS production_orders (
                id TEXT PRIMARY KEY,
                company_id TEXT NOT NULL REFERENCES companies(id),
                order_number TEXT NOT NULL,
                part_id TEXT NOT NULL REFERENCES parts(id),
                quantity INTEGER NOT NULL CHECK (quantity > 0),
                status TEXT NOT NULL,
                due_date TEXT,
                created TEXT NOT NULL,
                UNIQUE (company_id, order_number)
            );
            CREATE INDEX IF NOT EXISTS idx_orders_status ON production_orders(status);
            "#,
        )?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        tx.commit()?;
        tracing::debug!(version = SCHEMA_VERSION, "initialized database schema");
        Ok(())
    }
}
