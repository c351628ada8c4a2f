//! Import BOM lines from CSV

use csv::StringRecord;
use std::collections::HashMap;

use crate::bom::{BomError, BomGraph};
use crate::core::Store;
use crate::entities::{BomItem, Company};

use super::common::{get_field, parse_field, required_field, RowOutcome};

/// Turn one CSV row into a stored BOM line
///
/// Dry runs apply the rows to an in-memory snapshot instead, so cycles
/// formed across rows of the same file are still caught.
pub struct BomRowImporter<'a> {
    pub store: &'a mut Store,
    pub company: &'a Company,
    pub default_unit: &'a str,
    pub preview: Option<BomGraph>,
}

impl BomRowImporter<'_> {
    pub fn import_row(
        &mut self,
        record: &StringRecord,
        header_map: &HashMap<String, usize>,
    ) -> Result<RowOutcome, String> {
        let parent_ref = required_field(record, header_map, "parent")?;
        let component_ref = required_field(record, header_map, "component")?;
        let quantity: f64 = parse_field(record, header_map, "quantity")?
            .ok_or_else(|| "missing required field 'quantity'".to_string())?;
        let parent = self
            .store
            .resolve_part(self.company.id, &parent_ref)
            .map_err(|e| e.to_string())?;
        let component = self
            .store
            .resolve_part(self.company.id, &component_ref)
            .map_err(|e| e.to_string())?;
        let unit = get_field(record, header_map, "unit")
            .unwrap_or_else(|| component.line_unit(self.default_unit).to_string());
        let label = format!(
            "{} -> {} x {} {}",
            parent.part_number,
            component.part_number,
            quantity,
            unit.trim()
        );

        let previous = match self.preview.as_mut() {
            Some(graph) => {
                let item = BomItem::new(parent.id, component.id, quantity, unit)
                    .map_err(|e| e.to_string())?;
                let previous = graph
                    .add_or_update_edge(item.parent, item.component, item.quantity, item.unit)
                    .map_err(|e| match e {
                        BomError::Cycle { .. } => format!(
                            "adding {} to {} would create a BOM cycle",
                            component.part_number, parent.part_number
                        ),
                        other => other.to_string(),
                    })?;
                previous.is_some()
            }
            None => self
                .store
                .add_or_update_edge(parent.id, component.id, quantity, &unit)
                .map_err(|e| e.to_string())?
                .is_some(),
        };

        Ok(if previous {
            RowOutcome::Updated(label)
        } else {
            RowOutcome::Created(label)
        })
    }
}
