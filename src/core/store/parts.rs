//! Company and part queries

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{get_datetime, get_enum, get_id, get_optional_enum, Store, StoreError};
use crate::bom::BomError;
use crate::core::identity::{EntityId, EntityPrefix, PartId};
use crate::entities::{Company, Part, PartType};

pub(super) const PART_COLUMNS: &str = "id, company_id, part_number, name, part_type, \
     material_type, stock_quantity, reorder_level, unit, unit_cost, description, created";

/// Filter for part listings
#[derive(Debug, Default, Clone)]
pub struct PartFilter {
    /// Only parts of this type
    pub part_type: Option<PartType>,
    /// Case-insensitive substring match on part number or name
    pub search: Option<String>,
    /// Only parts at or below their reorder level
    pub low_stock: bool,
}

pub(super) fn part_from_row(row: &Row<'_>) -> rusqlite::Result<Part> {
    Ok(Part {
        id: get_id(row, 0)?,
        company_id: get_id(row, 1)?,
        part_number: row.get(2)?,
        name: row.get(3)?,
        part_type: get_enum(row, 4)?,
        material_type: get_optional_enum(row, 5)?,
        stock_quantity: row.get(6)?,
        reorder_level: row.get(7)?,
        unit: row.get(8)?,
        unit_cost: row.get(9)?,
        description: row.get(10)?,
        created: get_datetime(row, 11)?,
    })
}

fn company_from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: get_id(row, 0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        created: get_datetime(row, 3)?,
    })
}

/// Load a part by id, `NotFound` if absent
pub(super) fn fetch_part(conn: &Connection, id: PartId) -> Result<Part, StoreError> {
    let sql = format!("SELECT {} FROM parts WHERE id = ?1", PART_COLUMNS);
    conn.query_row(&sql, params![id.to_string()], part_from_row)
        .optional()?
        .ok_or_else(|| BomError::part_not_found(id).into())
}

/// Number of BOM lines that reference a part as parent or component
pub(super) fn bom_references(conn: &Connection, id: PartId) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bom_items WHERE part_id = ?1 OR component_part_id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Apply a stock delta, refusing to go below zero
pub(super) fn apply_stock_delta(
    conn: &Connection,
    part: &Part,
    delta: i64,
) -> Result<i64, StoreError> {
    let next = part.stock_quantity + delta;
    if next < 0 {
        return Err(StoreError::InsufficientStock {
            part_number: part.part_number.clone(),
            available: part.stock_quantity,
            required: -delta,
        });
    }
    conn.execute(
        "UPDATE parts SET stock_quantity = ?1 WHERE id = ?2",
        params![next, part.id.to_string()],
    )?;
    Ok(next)
}

impl Store {
    // =====================================================================
    // Companies
    // =====================================================================

    /// Create a company, refusing duplicate codes
    pub fn create_company(&mut self, company: &Company) -> Result<(), StoreError> {
        company.validate()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM companies WHERE code = ?1",
            params![company.code],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::DuplicateCompany {
                code: company.code.clone(),
            });
        }
        tx.execute(
            "INSERT INTO companies (id, code, name, created) VALUES (?1, ?2, ?3, ?4)",
            params![
                company.id.to_string(),
                company.code,
                company.name,
                company.created.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        tracing::info!(code = %company.code, id = %company.id, "created company");
        Ok(())
    }

    /// Find a company by code (case-insensitive) or by full id
    pub fn company(&self, reference: &str) -> Result<Company, StoreError> {
        let reference = reference.trim();
        let found = self
            .conn
            .query_row(
                "SELECT id, code, name, created FROM companies WHERE id = ?1 OR code = ?2",
                params![reference, reference.to_uppercase()],
                company_from_row,
            )
            .optional()?;
        found.ok_or_else(|| {
            BomError::NotFound {
                what: "company",
                id: reference.to_string(),
            }
            .into()
        })
    }

    /// All companies ordered by code
    pub fn companies(&self) -> Result<Vec<Company>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, code, name, created FROM companies ORDER BY code")?;
        let rows = stmt.query_map([], company_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // =====================================================================
    // Parts
    // =====================================================================

    /// Create a part, refusing a duplicate part number within its company
    pub fn create_part(&mut self, part: &Part) -> Result<(), StoreError> {
        part.validate()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let company_code: Option<String> = tx
            .query_row(
                "SELECT code FROM companies WHERE id = ?1",
                params![part.company_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let company_code = company_code.ok_or_else(|| BomError::NotFound {
            what: "company",
            id: part.company_id.to_string(),
        })?;

        let duplicate: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM parts WHERE company_id = ?1 AND part_number = ?2",
            params![part.company_id.to_string(), part.part_number],
            |row| row.get(0),
        )?;
        if duplicate {
            return Err(StoreError::DuplicatePartNumber {
                company: company_code,
                part_number: part.part_number.clone(),
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO parts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                PART_COLUMNS
            ),
            params![
                part.id.to_string(),
                part.company_id.to_string(),
                part.part_number,
                part.name,
                part.part_type.as_str(),
                part.material_type.map(|m| m.as_str()),
                part.stock_quantity,
                part.reorder_level,
                part.unit,
                part.unit_cost,
                part.description,
                part.created.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        tracing::info!(part_number = %part.part_number, id = %part.id, "created part");
        Ok(())
    }

    /// Load a part by id
    pub fn part(&self, id: PartId) -> Result<Part, StoreError> {
        fetch_part(&self.conn, id)
    }

    /// Load a part by its number within a company
    pub fn part_by_number(&self, company_id: EntityId, number: &str) -> Result<Part, StoreError> {
        let sql = format!(
            "SELECT {} FROM parts WHERE company_id = ?1 AND part_number = ?2",
            PART_COLUMNS
        );
        self.conn
            .query_row(
                &sql,
                params![company_id.to_string(), number.trim()],
                part_from_row,
            )
            .optional()?
            .ok_or_else(|| BomError::part_not_found(number.trim()).into())
    }

    /// Resolve a full `PART-...` id or a part number within the company
    pub fn resolve_part(&self, company_id: EntityId, reference: &str) -> Result<Part, StoreError> {
        if EntityPrefix::Part.matches(reference) {
            if let Ok(id) = EntityId::parse(reference.trim()) {
                let part = self.part(id)?;
                if part.company_id != company_id {
                    return Err(BomError::part_not_found(reference).into());
                }
                return Ok(part);
            }
        }
        self.part_by_number(company_id, reference)
    }

    /// List a company's parts ordered by part number
    pub fn parts(&self, company_id: EntityId, filter: &PartFilter) -> Result<Vec<Part>, StoreError> {
        let mut sql = format!("SELECT {} FROM parts WHERE company_id = ?1", PART_COLUMNS);
        let mut args: Vec<String> = vec![company_id.to_string()];

        if let Some(part_type) = filter.part_type {
            args.push(part_type.as_str().to_string());
            sql.push_str(&format!(" AND part_type = ?{}", args.len()));
        }
        if let Some(ref search) = filter.search {
            args.push(format!("%{}%", search.to_lowercase()));
            sql.push_str(&format!(
                " AND (LOWER(part_number) LIKE ?{n} OR LOWER(name) LIKE ?{n})",
                n = args.len()
            ));
        }
        if filter.low_stock {
            sql.push_str(" AND stock_quantity <= reorder_level");
        }
        sql.push_str(" ORDER BY part_number");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), part_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Parts whose stock is at or below their reorder level
    pub fn low_stock(&self, company_id: EntityId) -> Result<Vec<Part>, StoreError> {
        self.parts(
            company_id,
            &PartFilter {
                low_stock: true,
                ..PartFilter::default()
            },
        )
    }

    /// Persist edits to a part's descriptive fields, cost and reorder level
    ///
    /// Stock is only changed through [`Store::adjust_stock`] and order
    /// completion.
    pub fn update_part(&mut self, part: &Part) -> Result<(), StoreError> {
        part.validate()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = fetch_part(&tx, part.id)?;
        if current.part_number != part.part_number {
            return Err(BomError::validation("part numbers cannot be changed").into());
        }
        tx.execute(
            "UPDATE parts SET name = ?1, part_type = ?2, material_type = ?3, reorder_level = ?4, \
             unit = ?5, unit_cost = ?6, description = ?7 WHERE id = ?8",
            params![
                part.name,
                part.part_type.as_str(),
                part.material_type.map(|m| m.as_str()),
                part.reorder_level,
                part.unit,
                part.unit_cost,
                part.description,
                part.id.to_string(),
            ],
        )?;
        tx.commit()?;
        tracing::info!(part_number = %part.part_number, "updated part");
        Ok(())
    }

    /// Add `delta` units (negative to remove) and return the new stock level
    pub fn adjust_stock(&mut self, id: PartId, delta: i64) -> Result<i64, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let part = fetch_part(&tx, id)?;
        let stock = apply_stock_delta(&tx, &part, delta)?;
        tx.commit()?;
        tracing::info!(part_number = %part.part_number, delta, stock, "adjusted stock");
        Ok(stock)
    }

    /// Delete a part
    ///
    /// Refused while BOM lines reference the part unless `cascade` is set, in
    /// which case those lines go in the same transaction. Parts with
    /// production orders cannot be deleted. Returns the number of BOM lines
    /// removed.
    pub fn delete_part(&mut self, id: PartId, cascade: bool) -> Result<usize, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let part = fetch_part(&tx, id)?;

        let references = bom_references(&tx, id)?;
        if references > 0 && !cascade {
            return Err(StoreError::PartInUse {
                part_number: part.part_number,
                references,
            });
        }
        let orders: i64 = tx.query_row(
            "SELECT COUNT(*) FROM production_orders WHERE part_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        if orders > 0 {
            return Err(BomError::validation(format!(
                "part {} has {} production order(s)",
                part.part_number, orders
            ))
            .into());
        }

        let removed = tx.execute(
            "DELETE FROM bom_items WHERE part_id = ?1 OR component_part_id = ?1",
            params![id.to_string()],
        )?;
        tx.execute("DELETE FROM parts WHERE id = ?1", params![id.to_string()])?;
        tx.commit()?;
        tracing::info!(part_number = %part.part_number, removed, "deleted part");
        Ok(removed)
    }

    /// Known unit costs of a company's parts
    pub fn unit_costs(&self, company_id: EntityId) -> Result<HashMap<PartId, f64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, unit_cost FROM parts WHERE company_id = ?1 AND unit_cost IS NOT NULL",
        )?;
        let rows = stmt.query_map(params![company_id.to_string()], |row| {
            Ok((get_id(row, 0)?, row.get::<_, f64>(1)?))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MaterialType;

    fn setup() -> (Store, Company) {
        let mut store = Store::open_in_memory().unwrap();
        let company = Company::new("ACME", "Acme Manufacturing");
        store.create_company(&company).unwrap();
        (store, company)
    }

    fn part(company: &Company, number: &str, part_type: PartType) -> Part {
        Part::new(company.id, number, format!("Part {}", number), part_type, "pcs")
    }

    #[test]
    fn test_duplicate_company_code() {
        let (mut store, _) = setup();
        let err = store
            .create_company(&Company::new("acme", "Other"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCompany { .. }));
    }

    #[test]
    fn test_company_lookup_by_code_or_id() {
        let (store, company) = setup();
        assert_eq!(store.company("acme").unwrap().id, company.id);
        assert_eq!(store.company(&company.id.to_string()).unwrap().code, "ACME");
        assert!(matches!(
            store.company("NOPE").unwrap_err(),
            StoreError::Bom(BomError::NotFound { what: "company", .. })
        ));
    }

    #[test]
    fn test_create_and_load_part() {
        let (mut store, company) = setup();
        let bolt = part(&company, "BOLT-M6", PartType::Component)
            .with_material(MaterialType::Metal)
            .with_stock(100, 20)
            .with_unit_cost(0.12);
        store.create_part(&bolt).unwrap();

        let loaded = store.part(bolt.id).unwrap();
        assert_eq!(loaded.part_number, "BOLT-M6");
        assert_eq!(loaded.material_type, Some(MaterialType::Metal));
        assert_eq!(loaded.unit_cost, Some(0.12));
        assert_eq!(loaded.created.timestamp(), bolt.created.timestamp());

        let by_number = store.resolve_part(company.id, "BOLT-M6").unwrap();
        assert_eq!(by_number.id, bolt.id);
        let by_id = store.resolve_part(company.id, &bolt.id.to_string()).unwrap();
        assert_eq!(by_id.id, bolt.id);
    }

    #[test]
    fn test_duplicate_part_number_in_same_company() {
        let (mut store, company) = setup();
        store.create_part(&part(&company, "P-1", PartType::Component)).unwrap();
        let err = store
            .create_part(&part(&company, "P-1", PartType::Assembly))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePartNumber { .. }));

        // Same number in another company is fine
        let other = Company::new("BETA", "Beta");
        store.create_company(&other).unwrap();
        store.create_part(&part(&other, "P-1", PartType::Component)).unwrap();
    }

    #[test]
    fn test_resolve_part_from_other_company_is_not_found() {
        let (mut store, company) = setup();
        let other = Company::new("BETA", "Beta");
        store.create_company(&other).unwrap();
        let foreign = part(&other, "X-1", PartType::Component);
        store.create_part(&foreign).unwrap();

        assert!(store
            .resolve_part(company.id, &foreign.id.to_string())
            .is_err());
    }

    #[test]
    fn test_list_filters() {
        let (mut store, company) = setup();
        store
            .create_part(&part(&company, "FRAME", PartType::Assembly).with_stock(0, 2))
            .unwrap();
        store
            .create_part(&part(&company, "BOLT", PartType::Component).with_stock(50, 10))
            .unwrap();
        store
            .create_part(&part(&company, "BIKE", PartType::Product).with_stock(1, 1))
            .unwrap();

        let all = store.parts(company.id, &PartFilter::default()).unwrap();
        let numbers: Vec<_> = all.iter().map(|p| p.part_number.as_str()).collect();
        assert_eq!(numbers, vec!["BIKE", "BOLT", "FRAME"]);

        let assemblies = store
            .parts(
                company.id,
                &PartFilter {
                    part_type: Some(PartType::Assembly),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(assemblies.len(), 1);

        let search = store
            .parts(
                company.id,
                &PartFilter {
                    search: Some("bol".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(search[0].part_number, "BOLT");

        let low: Vec<_> = store
            .low_stock(company.id)
            .unwrap()
            .into_iter()
            .map(|p| p.part_number)
            .collect();
        assert_eq!(low, vec!["BIKE", "FRAME"]);
    }

    #[test]
    fn test_adjust_stock_never_goes_negative() {
        let (mut store, company) = setup();
        let bolt = part(&company, "BOLT", PartType::Component).with_stock(5, 0);
        store.create_part(&bolt).unwrap();

        assert_eq!(store.adjust_stock(bolt.id, 10).unwrap(), 15);
        assert_eq!(store.adjust_stock(bolt.id, -15).unwrap(), 0);
        let err = store.adjust_stock(bolt.id, -1).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock { available: 0, required: 1, .. }));
        assert_eq!(store.part(bolt.id).unwrap().stock_quantity, 0);
    }

    #[test]
    fn test_update_part_keeps_stock() {
        let (mut store, company) = setup();
        let bolt = part(&company, "BOLT", PartType::Component).with_stock(7, 0);
        store.create_part(&bolt).unwrap();

        let mut edited = bolt.clone().with_unit_cost(0.5);
        edited.reorder_level = 3;
        edited.stock_quantity = 999;
        store.update_part(&edited).unwrap();

        let loaded = store.part(bolt.id).unwrap();
        assert_eq!(loaded.unit_cost, Some(0.5));
        assert_eq!(loaded.reorder_level, 3);
        assert_eq!(loaded.stock_quantity, 7);
    }

    #[test]
    fn test_delete_part_in_use() {
        let (mut store, company) = setup();
        let frame = part(&company, "FRAME", PartType::Assembly);
        let tube = part(&company, "TUBE", PartType::RawMaterial);
        store.create_part(&frame).unwrap();
        store.create_part(&tube).unwrap();
        store.add_or_update_edge(frame.id, tube.id, 2.0, "m").unwrap();

        let err = store.delete_part(tube.id, false).unwrap_err();
        assert!(matches!(err, StoreError::PartInUse { references: 1, .. }));
        assert!(store.part(tube.id).is_ok());

        assert_eq!(store.delete_part(tube.id, true).unwrap(), 1);
        assert!(store.part(tube.id).is_err());
        assert!(store.children(frame.id).unwrap().is_empty());
    }

    #[test]
    fn test_unit_costs_skip_unpriced() {
        let (mut store, company) = setup();
        let priced = part(&company, "A", PartType::Component).with_unit_cost(2.0);
        store.create_part(&priced).unwrap();
        store.create_part(&part(&company, "B", PartType::Component)).unwrap();

        let costs = store.unit_costs(company.id).unwrap();
        assert_eq!(costs.len(), 1);
        assert_eq!(costs[&priced.id], 2.0);
    }
}
