//! BOM line queries

use std::collections::HashMap;

use rusqlite::{params, Connection, Row, TransactionBehavior};

use super::parts::{fetch_part, part_from_row, PART_COLUMNS};
use super::{get_id, Store, StoreError};
use crate::bom::{BomError, BomGraph};
use crate::core::identity::{EntityId, PartId};
use crate::entities::{BomItem, Part};

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<BomItem> {
    Ok(BomItem {
        parent: get_id(row, 0)?,
        component: get_id(row, 1)?,
        quantity: row.get(2)?,
        unit: row.get(3)?,
    })
}

pub(super) fn query_items(
    conn: &Connection,
    filter: &str,
    id: EntityId,
) -> Result<Vec<BomItem>, StoreError> {
    let sql = format!(
        "SELECT b.part_id, b.component_part_id, b.quantity, b.unit FROM bom_items b {} ORDER BY b.id",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![id.to_string()], item_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Every part and edge of a company as a graph snapshot
pub(super) fn load_snapshot(conn: &Connection, company_id: EntityId) -> Result<(BomGraph, Vec<Part>), StoreError> {
    let items = query_items(
        conn,
        "JOIN parts p ON p.id = b.part_id WHERE p.company_id = ?1",
        company_id,
    )?;
    let mut graph = BomGraph::from_items(items);

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM parts WHERE company_id = ?1",
        PART_COLUMNS
    ))?;
    let parts = stmt
        .query_map(params![company_id.to_string()], part_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for part in &parts {
        graph.add_part(part.id);
    }
    Ok((graph, parts))
}

/// Rewrite a cycle path of ids as part numbers
fn label_cycle(err: BomError, parts: &[Part]) -> BomError {
    match err {
        BomError::Cycle { path } => {
            let numbers: HashMap<String, &str> = parts
                .iter()
                .map(|p| (p.id.to_string(), p.part_number.as_str()))
                .collect();
            let path = path
                .into_iter()
                .map(|id| numbers.get(&id).map(|n| n.to_string()).unwrap_or(id))
                .collect();
            BomError::Cycle { path }
        }
        other => other,
    }
}

impl Store {
    /// Insert or update the `parent → component` line
    ///
    /// The company's edges are loaded inside the write transaction and the
    /// change is applied to that snapshot first, so validation and cycle
    /// detection see exactly what is committed. Returns the previous line
    /// when this was an update.
    pub fn add_or_update_edge(
        &mut self,
        parent: PartId,
        component: PartId,
        quantity: f64,
        unit: &str,
    ) -> Result<Option<BomItem>, StoreError> {
        let item = BomItem::new(parent, component, quantity, unit)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let parent_part = fetch_part(&tx, parent)?;
        let component_part = fetch_part(&tx, component)?;
        if parent_part.company_id != component_part.company_id {
            return Err(BomError::validation(format!(
                "{} and {} belong to different companies",
                parent_part.part_number, component_part.part_number
            ))
            .into());
        }

        let (mut graph, parts) = load_snapshot(&tx, parent_part.company_id)?;
        let previous = graph
            .add_or_update_edge(parent, component, item.quantity, item.unit.clone())
            .map_err(|e| label_cycle(e, &parts))?;

        tx.execute(
            "INSERT INTO bom_items (part_id, component_part_id, quantity, unit) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(part_id, component_part_id) \
             DO UPDATE SET quantity = excluded.quantity, unit = excluded.unit",
            params![
                parent.to_string(),
                component.to_string(),
                item.quantity,
                item.unit,
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            parent = %parent_part.part_number,
            component = %component_part.part_number,
            quantity = item.quantity,
            unit = %item.unit,
            updated = previous.is_some(),
            "stored BOM line"
        );
        Ok(previous.map(|edge| BomItem {
            parent,
            component,
            quantity: edge.quantity,
            unit: edge.unit,
        }))
    }

    /// Remove the `parent → component` line; returns whether one existed
    pub fn remove_edge(&mut self, parent: PartId, component: PartId) -> Result<bool, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute(
            "DELETE FROM bom_items WHERE part_id = ?1 AND component_part_id = ?2",
            params![parent.to_string(), component.to_string()],
        )?;
        tx.commit()?;
        if removed > 0 {
            tracing::info!(%parent, %component, "removed BOM line");
        } else {
            tracing::debug!(%parent, %component, "no BOM line to remove");
        }
        Ok(removed > 0)
    }

    /// Direct components of a part, in insertion order
    pub fn children(&self, part: PartId) -> Result<Vec<BomItem>, StoreError> {
        fetch_part(&self.conn, part)?;
        query_items(&self.conn, "WHERE b.part_id = ?1", part)
    }

    /// Direct parents of a part, in insertion order
    pub fn where_used(&self, part: PartId) -> Result<Vec<BomItem>, StoreError> {
        fetch_part(&self.conn, part)?;
        query_items(&self.conn, "WHERE b.component_part_id = ?1", part)
    }

    /// Consistent graph of a company's parts and BOM lines
    pub fn snapshot(&self, company_id: EntityId) -> Result<BomGraph, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let (graph, _) = load_snapshot(&tx, company_id)?;
        tx.commit()?;
        Ok(graph)
    }
}
