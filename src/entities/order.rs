//! Production order entity - a request to build a quantity of a part

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::bom::BomError;
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix, PartId};

/// Production order lifecycle
///
/// `Planned -> InProgress -> Completed`, and either open state may be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Planned => "PLANNED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether the order can still change
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Planned | OrderStatus::InProgress)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Planned, OrderStatus::InProgress)
                | (OrderStatus::InProgress, OrderStatus::Completed)
                | (OrderStatus::Planned, OrderStatus::Cancelled)
                | (OrderStatus::InProgress, OrderStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "PLANNED" => Ok(OrderStatus::Planned),
            "IN_PROGRESS" => Ok(OrderStatus::InProgress),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// A production order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionOrder {
    /// Unique identifier (ORD-...)
    pub id: EntityId,

    /// Owning company (CORP-...)
    pub company_id: EntityId,

    /// Order number, unique within the company
    pub order_number: String,

    /// Part to build
    pub part_id: PartId,

    /// Whole units of the part to build
    pub quantity: i64,

    #[serde(default)]
    pub status: OrderStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    pub created: DateTime<Utc>,
}

impl Entity for ProductionOrder {
    const PREFIX: &'static str = "ORD";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.order_number
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl ProductionOrder {
    pub fn new(
        company_id: EntityId,
        order_number: impl Into<String>,
        part_id: PartId,
        quantity: i64,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Ord),
            company_id,
            order_number: order_number.into().trim().to_string(),
            part_id,
            quantity,
            status: OrderStatus::Planned,
            due_date: None,
            created: Utc::now(),
        }
    }

    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn validate(&self) -> Result<(), BomError> {
        if self.order_number.is_empty() {
            return Err(BomError::validation("order number must not be empty"));
        }
        if self.quantity <= 0 {
            return Err(BomError::validation(format!(
                "order quantity must be greater than zero (got {})",
                self.quantity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Planned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Planned.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));

        assert!(!Planned.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Planned));
        assert!(!InProgress.can_transition_to(Planned));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in-progress".parse::<OrderStatus>().unwrap(), OrderStatus::InProgress);
        assert_eq!(OrderStatus::Cancelled.to_string(), "CANCELLED");
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_validation() {
        let company = EntityId::new(EntityPrefix::Corp);
        let part = EntityId::new(EntityPrefix::Part);
        assert!(ProductionOrder::new(company, "WO-1", part, 10).validate().is_ok());
        assert!(ProductionOrder::new(company, "WO-1", part, 0).validate().is_err());
        assert!(ProductionOrder::new(company, " ", part, 1).validate().is_err());
    }
}
