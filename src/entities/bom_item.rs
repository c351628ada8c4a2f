//! BOM item - a directed "parent requires quantity of component" edge

use serde::{Deserialize, Serialize};

use crate::bom::BomError;
use crate::core::identity::PartId;

/// BOM line item - the parent part requires `quantity` `unit` of the component
/// per unit produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    /// Part being built (PART-...)
    pub parent: PartId,

    /// Part consumed (PART-...)
    pub component: PartId,

    /// Quantity of the component per parent unit, always > 0
    pub quantity: f64,

    /// Unit of measure for the quantity
    pub unit: String,
}

impl BomItem {
    /// Create a validated BOM line
    pub fn new(
        parent: PartId,
        component: PartId,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Result<Self, BomError> {
        let item = Self {
            parent,
            component,
            quantity,
            unit: unit.into().trim().to_string(),
        };
        item.validate()?;
        Ok(item)
    }

    /// Check the per-edge invariants (cycle checks need the whole graph)
    pub fn validate(&self) -> Result<(), BomError> {
        if self.parent == self.component {
            return Err(BomError::validation(format!(
                "part {} cannot be a component of itself",
                self.parent
            )));
        }
        validate_quantity(self.quantity)?;
        if self.unit.is_empty() {
            return Err(BomError::validation("unit of measure must not be empty"));
        }
        Ok(())
    }

    /// Extended quantity for `parent_quantity` units of the parent
    pub fn extended(&self, parent_quantity: f64) -> f64 {
        self.quantity * parent_quantity
    }
}

/// Quantities must be finite and strictly positive
pub fn validate_quantity(quantity: f64) -> Result<(), BomError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(BomError::validation(format!(
            "quantity must be greater than zero (got {})",
            quantity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{EntityId, EntityPrefix};

    fn part() -> PartId {
        EntityId::new(EntityPrefix::Part)
    }

    #[test]
    fn test_bom_item_creation_trims_unit() {
        let (a, b) = (part(), part());
        let item = BomItem::new(a, b, 2.5, " kg ").unwrap();
        assert_eq!(item.unit, "kg");
        assert_eq!(item.extended(4.0), 10.0);
    }

    #[test]
    fn test_self_reference_rejected() {
        let a = part();
        let err = BomItem::new(a, a, 1.0, "pcs").unwrap_err();
        assert!(matches!(err, BomError::Validation { .. }));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let (a, b) = (part(), part());
        for qty in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = BomItem::new(a, b, qty, "pcs").unwrap_err();
            assert!(matches!(err, BomError::Validation { .. }), "qty {qty}");
        }
    }

    #[test]
    fn test_blank_unit_rejected() {
        let err = BomItem::new(part(), part(), 1.0, "  ").unwrap_err();
        assert!(matches!(err, BomError::Validation { .. }));
    }
}
