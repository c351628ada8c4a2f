//! Part entity - raw materials, components, assemblies and products

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bom::BomError;
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix, PartId};

/// Part category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartType {
    RawMaterial,
    Component,
    Assembly,
    Product,
}

impl PartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartType::RawMaterial => "RAW_MATERIAL",
            PartType::Component => "COMPONENT",
            PartType::Assembly => "ASSEMBLY",
            PartType::Product => "PRODUCT",
        }
    }
}

impl Default for PartType {
    fn default() -> Self {
        PartType::Component
    }
}

impl std::fmt::Display for PartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "RAW_MATERIAL" | "RAW" => Ok(PartType::RawMaterial),
            "COMPONENT" => Ok(PartType::Component),
            "ASSEMBLY" => Ok(PartType::Assembly),
            "PRODUCT" => Ok(PartType::Product),
            _ => Err(format!(
                "Invalid part type: {}. Use raw_material, component, assembly, or product",
                s
            )),
        }
    }
}

/// Material classification of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialType {
    Metal,
    Plastic,
    Electronic,
    Chemical,
    Textile,
    Other,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Metal => "METAL",
            MaterialType::Plastic => "PLASTIC",
            MaterialType::Electronic => "ELECTRONIC",
            MaterialType::Chemical => "CHEMICAL",
            MaterialType::Textile => "TEXTILE",
            MaterialType::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for MaterialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MaterialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "METAL" => Ok(MaterialType::Metal),
            "PLASTIC" => Ok(MaterialType::Plastic),
            "ELECTRONIC" => Ok(MaterialType::Electronic),
            "CHEMICAL" => Ok(MaterialType::Chemical),
            "TEXTILE" => Ok(MaterialType::Textile),
            "OTHER" => Ok(MaterialType::Other),
            _ => Err(format!(
                "Invalid material type: {}. Use metal, plastic, electronic, chemical, textile, or other",
                s
            )),
        }
    }
}

/// A Part entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Unique identifier (PART-...)
    pub id: PartId,

    /// Owning company (CORP-...)
    pub company_id: EntityId,

    /// Part number, unique within the company
    pub part_number: String,

    /// Display name
    pub name: String,

    /// Category
    #[serde(rename = "type")]
    pub part_type: PartType,

    /// Material classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<MaterialType>,

    /// Units on hand
    #[serde(default)]
    pub stock_quantity: i64,

    /// Stock level at or below which the part should be reordered
    #[serde(default)]
    pub reorder_level: i64,

    /// Unit of measure for stock
    pub unit: String,

    /// Cost per unit of measure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,

    /// Detailed description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,
}

impl Entity for Part {
    const PREFIX: &'static str = "PART";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.part_number
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Part {
    /// Create a new part with required fields
    pub fn new(
        company_id: EntityId,
        part_number: impl Into<String>,
        name: impl Into<String>,
        part_type: PartType,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Part),
            company_id,
            part_number: part_number.into().trim().to_string(),
            name: name.into().trim().to_string(),
            part_type,
            material_type: None,
            stock_quantity: 0,
            reorder_level: 0,
            unit: unit.into().trim().to_string(),
            unit_cost: None,
            description: None,
            created: Utc::now(),
        }
    }

    /// Unit for a new BOM line consuming this part: its own stock unit, or
    /// `fallback` when none is recorded
    pub fn line_unit<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.unit.is_empty() {
            fallback
        } else {
            &self.unit
        }
    }

    pub fn with_material(mut self, material: MaterialType) -> Self {
        self.material_type = Some(material);
        self
    }

    pub fn with_stock(mut self, stock: i64, reorder_level: i64) -> Self {
        self.stock_quantity = stock;
        self.reorder_level = reorder_level;
        self
    }

    pub fn with_unit_cost(mut self, unit_cost: f64) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check field invariants before the part is persisted
    pub fn validate(&self) -> Result<(), BomError> {
        if self.part_number.is_empty() {
            return Err(BomError::validation("part number must not be empty"));
        }
        if self.name.is_empty() {
            return Err(BomError::validation(format!(
                "part {} needs a name",
                self.part_number
            )));
        }
        if self.unit.is_empty() {
            return Err(BomError::validation(format!(
                "part {} needs a unit of measure",
                self.part_number
            )));
        }
        if self.stock_quantity < 0 || self.reorder_level < 0 {
            return Err(BomError::validation(format!(
                "part {}: stock and reorder level must not be negative",
                self.part_number
            )));
        }
        if let Some(cost) = self.unit_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(BomError::validation(format!(
                    "part {}: unit cost must be zero or more (got {})",
                    self.part_number, cost
                )));
            }
        }
        Ok(())
    }

    /// Stock is at or below the reorder level
    pub fn needs_reorder(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> EntityId {
        EntityId::new(EntityPrefix::Corp)
    }

    #[test]
    fn test_part_creation() {
        let part = Part::new(company(), " FR-100 ", "Frame", PartType::Assembly, "pcs")
            .with_stock(5, 2)
            .with_unit_cost(42.0);
        assert_eq!(part.part_number, "FR-100");
        assert_eq!(part.label(), "FR-100");
        assert!(part.id().to_string().starts_with("PART-"));
        assert!(!part.needs_reorder());
        assert!(part.validate().is_ok());
    }

    #[test]
    fn test_part_validation_failures() {
        let base = Part::new(company(), "P-1", "Bolt", PartType::Component, "pcs");

        let blank = Part::new(company(), "  ", "Bolt", PartType::Component, "pcs");
        assert!(blank.validate().is_err());

        let negative = base.clone().with_stock(-1, 0);
        assert!(negative.validate().is_err());

        let bad_cost = base.clone().with_unit_cost(f64::NAN);
        assert!(bad_cost.validate().is_err());

        let no_unit = Part::new(company(), "P-2", "Bolt", PartType::Component, "");
        assert!(no_unit.validate().is_err());
    }

    #[test]
    fn test_line_unit_prefers_stock_unit() {
        let tube = Part::new(company(), "TUBE", "Tube", PartType::RawMaterial, "m");
        assert_eq!(tube.line_unit("pcs"), "m");
        let unitless = Part::new(company(), "X", "X", PartType::Component, "");
        assert_eq!(unitless.line_unit("pcs"), "pcs");
    }

    #[test]
    fn test_part_type_parsing() {
        assert_eq!("raw_material".parse::<PartType>().unwrap(), PartType::RawMaterial);
        assert_eq!("raw-material".parse::<PartType>().unwrap(), PartType::RawMaterial);
        assert_eq!("PRODUCT".parse::<PartType>().unwrap(), PartType::Product);
        assert!("widget".parse::<PartType>().is_err());
        assert_eq!(PartType::Assembly.to_string(), "ASSEMBLY");
    }

    #[test]
    fn test_part_serializes_type_field() {
        let part = Part::new(company(), "STEEL-1", "Steel tube", PartType::RawMaterial, "m")
            .with_material(MaterialType::Metal);
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"type\":\"RAW_MATERIAL\""));
        assert!(json.contains("\"material_type\":\"METAL\""));
    }

    #[test]
    fn test_reorder_at_threshold() {
        let part = Part::new(company(), "P-1", "Bolt", PartType::Component, "pcs").with_stock(3, 3);
        assert!(part.needs_reorder());
    }
}
