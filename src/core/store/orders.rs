//! Production order queries, planning and completion

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::Serialize;

use super::bom::{load_snapshot, query_items};
use super::parts::{apply_stock_delta, fetch_part};
use super::{get_datetime, get_enum, get_id, get_optional_date, Store, StoreError};
use crate::bom::BomError;
use crate::core::identity::{EntityId, EntityPrefix, PartId};
use crate::entities::{OrderStatus, Part, ProductionOrder};

const ORDER_COLUMNS: &str =
    "id, company_id, order_number, part_id, quantity, status, due_date, created";

/// Requirement of one part for an order, against stock on hand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanLine {
    pub part_id: PartId,
    pub part_number: String,
    pub name: String,
    /// Stock unit of the part
    pub unit: String,
    /// Total over every path, whatever unit the BOM lines were written in
    pub required: f64,
    pub on_hand: i64,
    /// `required - on_hand`, never negative
    pub shortage: f64,
    /// BOM line units that differ from the stock unit
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub foreign_units: Vec<String>,
}

/// Material plan for a production order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPlan {
    pub order: ProductionOrder,
    /// Lowest-level requirements ordered by part number
    pub lines: Vec<PlanLine>,
}

impl OrderPlan {
    /// Every requirement is covered by stock on hand
    pub fn is_feasible(&self) -> bool {
        self.lines.iter().all(|line| line.shortage <= 0.0)
    }
}

/// Stock movements performed when an order completes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionSummary {
    pub order: ProductionOrder,
    /// `(part number, units consumed)` per direct component
    pub consumed: Vec<(String, i64)>,
    /// Units added to the built part
    pub produced: i64,
    /// `(part number, units missing)` for components consumed with `force`
    pub shortfalls: Vec<(String, i64)>,
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<ProductionOrder> {
    Ok(ProductionOrder {
        id: get_id(row, 0)?,
        company_id: get_id(row, 1)?,
        order_number: row.get(2)?,
        part_id: get_id(row, 3)?,
        quantity: row.get(4)?,
        status: get_enum(row, 5)?,
        due_date: get_optional_date(row, 6)?,
        created: get_datetime(row, 7)?,
    })
}

fn fetch_order(conn: &Connection, id: EntityId) -> Result<ProductionOrder, StoreError> {
    let sql = format!("SELECT {} FROM production_orders WHERE id = ?1", ORDER_COLUMNS);
    conn.query_row(&sql, params![id.to_string()], order_from_row)
        .optional()?
        .ok_or_else(|| {
            BomError::NotFound {
                what: "order",
                id: id.to_string(),
            }
            .into()
        })
}

fn write_status(conn: &Connection, id: EntityId, status: OrderStatus) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE production_orders SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    Ok(())
}

fn check_transition(order: &ProductionOrder, next: OrderStatus) -> Result<(), StoreError> {
    if order.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            order_number: order.order_number.clone(),
            from: order.status,
            to: next,
        })
    }
}

/// Whole units consumed for a fractional requirement
fn whole_units(quantity: f64) -> i64 {
    quantity.ceil() as i64
}

impl Store {
    /// Create a production order for a part of the same company
    pub fn create_order(&mut self, order: &ProductionOrder) -> Result<(), StoreError> {
        order.validate()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let part = fetch_part(&tx, order.part_id)?;
        if part.company_id != order.company_id {
            return Err(BomError::part_not_found(order.part_id).into());
        }
        let duplicate: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM production_orders WHERE company_id = ?1 AND order_number = ?2",
            params![order.company_id.to_string(), order.order_number],
            |row| row.get(0),
        )?;
        if duplicate {
            return Err(StoreError::DuplicateOrderNumber {
                order_number: order.order_number.clone(),
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO production_orders ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                ORDER_COLUMNS
            ),
            params![
                order.id.to_string(),
                order.company_id.to_string(),
                order.order_number,
                order.part_id.to_string(),
                order.quantity,
                order.status.as_str(),
                order.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                order.created.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        tracing::info!(
            order_number = %order.order_number,
            part = %part.part_number,
            quantity = order.quantity,
            "created production order"
        );
        Ok(())
    }

    /// Find an order by full `ORD-...` id or by order number within the company
    pub fn order(&self, company_id: EntityId, reference: &str) -> Result<ProductionOrder, StoreError> {
        let reference = reference.trim();
        if EntityPrefix::Ord.matches(reference) {
            if let Ok(id) = EntityId::parse(reference) {
                let order = fetch_order(&self.conn, id)?;
                if order.company_id == company_id {
                    return Ok(order);
                }
            }
        }
        let sql = format!(
            "SELECT {} FROM production_orders WHERE company_id = ?1 AND order_number = ?2",
            ORDER_COLUMNS
        );
        self.conn
            .query_row(&sql, params![company_id.to_string(), reference], order_from_row)
            .optional()?
            .ok_or_else(|| {
                BomError::NotFound {
                    what: "order",
                    id: reference.to_string(),
                }
                .into()
            })
    }

    /// A company's orders, optionally filtered by status, ordered by number
    pub fn orders(
        &self,
        company_id: EntityId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<ProductionOrder>, StoreError> {
        let mut sql = format!(
            "SELECT {} FROM production_orders WHERE company_id = ?1",
            ORDER_COLUMNS
        );
        let mut args = vec![company_id.to_string()];
        if let Some(status) = status {
            sql.push_str(" AND status = ?2");
            args.push(status.as_str().to_string());
        }
        sql.push_str(" ORDER BY order_number");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), order_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Move an order to `next` (start or cancel)
    ///
    /// Completion moves stock and goes through [`Store::complete_order`].
    pub fn transition_order(
        &mut self,
        id: EntityId,
        next: OrderStatus,
    ) -> Result<ProductionOrder, StoreError> {
        if next == OrderStatus::Completed {
            return self.complete_order(id, false).map(|summary| summary.order);
        }
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut order = fetch_order(&tx, id)?;
        check_transition(&order, next)?;
        write_status(&tx, id, next)?;
        tx.commit()?;

        tracing::info!(order_number = %order.order_number, from = %order.status, to = %next, "order status changed");
        order.status = next;
        Ok(order)
    }

    /// Explode the order's part and compare the requirements with stock
    pub fn plan_order(
        &self,
        order: &ProductionOrder,
        max_depth: usize,
    ) -> Result<OrderPlan, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let (graph, parts) = load_snapshot(&tx, order.company_id)?;
        tx.commit()?;

        let by_id: HashMap<PartId, &Part> = parts.iter().map(|p| (p.id, p)).collect();
        let explosion = graph.explode(order.part_id, order.quantity as f64, max_depth)?;

        // Stock is held per part, so requirements reached in several units are summed
        let mut by_part: HashMap<PartId, PlanLine> = HashMap::new();
        for line in explosion.lines {
            if line.part == order.part_id {
                continue;
            }
            let Some(part) = by_id.get(&line.part) else {
                continue;
            };
            let entry = by_part.entry(part.id).or_insert_with(|| PlanLine {
                part_id: part.id,
                part_number: part.part_number.clone(),
                name: part.name.clone(),
                unit: part.unit.clone(),
                required: 0.0,
                on_hand: part.stock_quantity,
                shortage: 0.0,
                foreign_units: Vec::new(),
            });
            entry.required += line.quantity;
            if line.unit != part.unit && !entry.foreign_units.contains(&line.unit) {
                entry.foreign_units.push(line.unit);
            }
        }

        let mut lines: Vec<PlanLine> = by_part
            .into_values()
            .map(|mut line| {
                line.shortage = (line.required - line.on_hand as f64).max(0.0);
                line.foreign_units.sort();
                line
            })
            .collect();
        lines.sort_by(|a, b| a.part_number.cmp(&b.part_number));

        let mixed: Vec<&str> = lines
            .iter()
            .filter(|l| !l.foreign_units.is_empty())
            .map(|l| l.part_number.as_str())
            .collect();
        if !mixed.is_empty() {
            tracing::warn!(order_number = %order.order_number, parts = ?mixed, "plan sums BOM lines written in a unit other than the stock unit");
        }

        Ok(OrderPlan {
            order: order.clone(),
            lines,
        })
    }

    /// Complete an in-progress order
    ///
    /// Consumes the direct components of the built part (rounded up to whole
    /// units) and adds the order quantity to its stock, atomically. Refused
    /// with [`StoreError::InsufficientStock`] if a component would go
    /// negative, unless `force` is set, in which case that component is
    /// drawn down to zero and the missing units are reported.
    pub fn complete_order(
        &mut self,
        id: EntityId,
        force: bool,
    ) -> Result<CompletionSummary, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut order = fetch_order(&tx, id)?;
        check_transition(&order, OrderStatus::Completed)?;

        let mut draws: Vec<(Part, i64)> = Vec::new();
        let mut shortfalls = Vec::new();
        for item in query_items(&tx, "WHERE b.part_id = ?1", order.part_id)? {
            let component = fetch_part(&tx, item.component)?;
            let required = whole_units(item.extended(order.quantity as f64));
            if component.stock_quantity < required {
                if !force {
                    return Err(StoreError::InsufficientStock {
                        part_number: component.part_number,
                        available: component.stock_quantity,
                        required,
                    });
                }
                shortfalls.push((
                    component.part_number.clone(),
                    required - component.stock_quantity,
                ));
            }
            let draw = required.min(component.stock_quantity);
            draws.push((component, draw));
        }

        let mut consumed = Vec::with_capacity(draws.len());
        for (component, draw) in draws {
            apply_stock_delta(&tx, &component, -draw)?;
            consumed.push((component.part_number, draw));
        }
        let built = fetch_part(&tx, order.part_id)?;
        apply_stock_delta(&tx, &built, order.quantity)?;
        write_status(&tx, id, OrderStatus::Completed)?;
        tx.commit()?;

        if !shortfalls.is_empty() {
            tracing::warn!(order_number = %order.order_number, ?shortfalls, "order completed with missing stock");
        }
        tracing::info!(order_number = %order.order_number, produced = order.quantity, "order completed");
        order.status = OrderStatus::Completed;
        Ok(CompletionSummary {
            produced: order.quantity,
            order,
            consumed,
            shortfalls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Company, PartType};

    struct Shop {
        store: Store,
        company: Company,
        bike: Part,
        frame: Part,
        wheel: Part,
        spoke: Part,
    }

    /// bike -> frame x1, wheel x2; wheel -> spoke x36
    fn shop() -> Shop {
        let mut store = Store::open_in_memory().unwrap();
        let company = Company::new("ACME", "Acme");
        store.create_company(&company).unwrap();

        let bike = Part::new(company.id, "BIKE", "Bike", PartType::Product, "pcs");
        let frame = Part::new(company.id, "FRAME", "Frame", PartType::Assembly, "pcs").with_stock(5, 0);
        let wheel = Part::new(company.id, "WHEEL", "Wheel", PartType::Assembly, "pcs").with_stock(3, 0);
        let spoke = Part::new(company.id, "SPOKE", "Spoke", PartType::Component, "pcs").with_stock(50, 0);
        for part in [&bike, &frame, &wheel, &spoke] {
            store.create_part(part).unwrap();
        }
        store.add_or_update_edge(bike.id, frame.id, 1.0, "pcs").unwrap();
        store.add_or_update_edge(bike.id, wheel.id, 2.0, "pcs").unwrap();
        store.add_or_update_edge(wheel.id, spoke.id, 36.0, "pcs").unwrap();

        Shop {
            store,
            company,
            bike,
            frame,
            wheel,
            spoke,
        }
    }

    #[test]
    fn test_order_numbers_are_unique() {
        let mut s = shop();
        let order = ProductionOrder::new(s.company.id, "WO-1", s.bike.id, 1);
        s.store.create_order(&order).unwrap();
        let again = ProductionOrder::new(s.company.id, "WO-1", s.bike.id, 2);
        assert!(matches!(
            s.store.create_order(&again).unwrap_err(),
            StoreError::DuplicateOrderNumber { .. }
        ));

        let loaded = s.store.order(s.company.id, "WO-1").unwrap();
        assert_eq!(loaded.id, order.id);
        assert_eq!(s.store.order(s.company.id, &order.id.to_string()).unwrap().order_number, "WO-1");
    }

    #[test]
    fn test_plan_reports_shortages() {
        let mut s = shop();
        let order = ProductionOrder::new(s.company.id, "WO-1", s.bike.id, 2);
        s.store.create_order(&order).unwrap();

        let plan = s.store.plan_order(&order, 64).unwrap();
        let numbers: Vec<_> = plan.lines.iter().map(|l| l.part_number.as_str()).collect();
        assert_eq!(numbers, vec!["FRAME", "SPOKE"]);

        let spoke = &plan.lines[1];
        assert_eq!(spoke.required, 144.0);
        assert_eq!(spoke.on_hand, 50);
        assert_eq!(spoke.shortage, 94.0);
        assert_eq!(plan.lines[0].shortage, 0.0);
        assert!(!plan.is_feasible());
    }

    #[test]
    fn test_plan_sums_part_reached_in_two_units() {
        let mut store = Store::open_in_memory().unwrap();
        let company = Company::new("ACME", "Acme");
        store.create_company(&company).unwrap();
        let root = Part::new(company.id, "ROOT", "Root", PartType::Product, "pcs");
        let sub = Part::new(company.id, "SUB", "Sub", PartType::Assembly, "pcs").with_stock(1, 0);
        let bolt = Part::new(company.id, "BOLT", "Bolt", PartType::Component, "pcs").with_stock(6, 0);
        for part in [&root, &sub, &bolt] {
            store.create_part(part).unwrap();
        }
        store.add_or_update_edge(root.id, bolt.id, 4.0, "pcs").unwrap();
        store.add_or_update_edge(root.id, sub.id, 1.0, "pcs").unwrap();
        store.add_or_update_edge(sub.id, bolt.id, 4.0, "ea").unwrap();

        let order = ProductionOrder::new(company.id, "WO-1", root.id, 1);
        store.create_order(&order).unwrap();
        let plan = store.plan_order(&order, 64).unwrap();

        let bolts: Vec<_> = plan.lines.iter().filter(|l| l.part_id == bolt.id).collect();
        assert_eq!(bolts.len(), 1);
        assert_eq!(bolts[0].unit, "pcs");
        assert_eq!(bolts[0].required, 8.0);
        assert_eq!(bolts[0].shortage, 2.0);
        assert_eq!(bolts[0].foreign_units, vec!["ea".to_string()]);
        assert!(!plan.is_feasible());
    }

    #[test]
    fn test_complete_requires_start() {
        let mut s = shop();
        let order = ProductionOrder::new(s.company.id, "WO-1", s.bike.id, 1);
        s.store.create_order(&order).unwrap();

        let err = s.store.complete_order(order.id, false).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_complete_moves_stock() {
        let mut s = shop();
        let order = ProductionOrder::new(s.company.id, "WO-1", s.bike.id, 1);
        s.store.create_order(&order).unwrap();
        s.store.transition_order(order.id, OrderStatus::InProgress).unwrap();

        let summary = s.store.complete_order(order.id, false).unwrap();
        assert_eq!(summary.order.status, OrderStatus::Completed);
        assert_eq!(summary.produced, 1);
        assert!(summary.shortfalls.is_empty());

        assert_eq!(s.store.part(s.bike.id).unwrap().stock_quantity, 1);
        assert_eq!(s.store.part(s.frame.id).unwrap().stock_quantity, 4);
        assert_eq!(s.store.part(s.wheel.id).unwrap().stock_quantity, 1);
        // Only direct components are consumed
        assert_eq!(s.store.part(s.spoke.id).unwrap().stock_quantity, 50);
        assert_eq!(
            s.store.order(s.company.id, "WO-1").unwrap().status,
            OrderStatus::Completed
        );
    }

    #[test]
    fn test_insufficient_stock_changes_nothing() {
        let mut s = shop();
        let order = ProductionOrder::new(s.company.id, "WO-2", s.bike.id, 2);
        s.store.create_order(&order).unwrap();
        s.store.transition_order(order.id, OrderStatus::InProgress).unwrap();

        let err = s.store.complete_order(order.id, false).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { available: 3, required: 4, .. }
        ));
        assert_eq!(s.store.part(s.frame.id).unwrap().stock_quantity, 5);
        assert_eq!(s.store.part(s.bike.id).unwrap().stock_quantity, 0);
        assert_eq!(
            s.store.order(s.company.id, "WO-2").unwrap().status,
            OrderStatus::InProgress
        );
    }

    #[test]
    fn test_forced_completion_draws_to_zero() {
        let mut s = shop();
        let order = ProductionOrder::new(s.company.id, "WO-3", s.bike.id, 2);
        s.store.create_order(&order).unwrap();
        s.store.transition_order(order.id, OrderStatus::InProgress).unwrap();

        let summary = s.store.complete_order(order.id, true).unwrap();
        assert_eq!(summary.shortfalls, vec![("WHEEL".to_string(), 1)]);
        assert_eq!(s.store.part(s.wheel.id).unwrap().stock_quantity, 0);
        assert_eq!(s.store.part(s.bike.id).unwrap().stock_quantity, 2);
    }

    #[test]
    fn test_cancel_and_list_by_status() {
        let mut s = shop();
        let a = ProductionOrder::new(s.company.id, "WO-A", s.bike.id, 1);
        let b = ProductionOrder::new(s.company.id, "WO-B", s.bike.id, 1);
        s.store.create_order(&a).unwrap();
        s.store.create_order(&b).unwrap();

        let cancelled = s.store.transition_order(a.id, OrderStatus::Cancelled).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(s.store.transition_order(a.id, OrderStatus::InProgress).is_err());

        let planned = s.store.orders(s.company.id, Some(OrderStatus::Planned)).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].order_number, "WO-B");
        assert_eq!(s.store.orders(s.company.id, None).unwrap().len(), 2);
    }
}
