//! Import parts from CSV

use csv::StringRecord;
use std::collections::{HashMap, HashSet};

use crate::bom::BomError;
use crate::core::{Store, StoreError};
use crate::entities::{Company, MaterialType, Part, PartType};

use super::common::{get_field, parse_field, required_field, RowOutcome};

/// Turn one CSV row into a stored part (or a dry-run preview of one)
pub struct PartRowImporter<'a> {
    pub store: &'a mut Store,
    pub company: &'a Company,
    pub default_unit: &'a str,
    pub dry_run: bool,
    pub update: bool,
    /// Part numbers already seen in this file
    pub seen: HashSet<String>,
}

impl PartRowImporter<'_> {
    pub fn import_row(
        &mut self,
        record: &StringRecord,
        header_map: &HashMap<String, usize>,
    ) -> Result<RowOutcome, String> {
        let part_number = required_field(record, header_map, "part_number")?;
        if !self.seen.insert(part_number.clone()) {
            return Err(format!("part number {} repeated in file", part_number));
        }

        let name = get_field(record, header_map, "name")
            .unwrap_or_else(|| part_number.clone());
        let part_type: PartType = parse_field(record, header_map, "type")?.unwrap_or(PartType::Component);
        let material: Option<MaterialType> = parse_field(record, header_map, "material_type")?;
        let stock: i64 = parse_field(record, header_map, "stock")?.unwrap_or(0);
        let reorder: i64 = parse_field(record, header_map, "reorder_level")?.unwrap_or(0);
        let unit = get_field(record, header_map, "unit")
            .unwrap_or_else(|| self.default_unit.to_string());
        let cost: Option<f64> = parse_field(record, header_map, "unit_cost")?;
        let description = get_field(record, header_map, "description");

        let existing = match self.store.part_by_number(self.company.id, &part_number) {
            Ok(part) => Some(part),
            Err(StoreError::Bom(BomError::NotFound { .. })) => None,
            Err(e) => return Err(e.to_string()),
        };

        let label = format!("{} - {}", part_number, name);
        match existing {
            Some(_) if !self.update => Err(StoreError::DuplicatePartNumber {
                company: self.company.code.clone(),
                part_number,
            }
            .to_string()),
            Some(mut part) => {
                // Stock moves only through adjustments and orders
                part.name = name;
                part.part_type = part_type;
                part.material_type = material.or(part.material_type);
                part.reorder_level = reorder;
                part.unit = unit;
                part.unit_cost = cost.or(part.unit_cost);
                part.description = description.or(part.description);
                part.validate().map_err(|e| e.to_string())?;
                if !self.dry_run {
                    self.store.update_part(&part).map_err(|e| e.to_string())?;
                }
                Ok(RowOutcome::Updated(label))
            }
            None => {
                let mut part = Part::new(self.company.id, &part_number, name, part_type, unit)
                    .with_stock(stock, reorder);
                part.material_type = material;
                part.unit_cost = cost;
                part.description = description;
                part.validate().map_err(|e| e.to_string())?;
                if !self.dry_run {
                    self.store.create_part(&part).map_err(|e| e.to_string())?;
                }
                Ok(RowOutcome::Created(label))
            }
        }
    }
}
