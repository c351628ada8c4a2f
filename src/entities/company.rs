//! Company entity - the tenancy boundary for parts and orders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bom::BomError;
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// A company owning parts, BOMs and production orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    /// Unique identifier (CORP-...)
    pub id: EntityId,

    /// Short unique code, stored uppercase (e.g. "ACME")
    pub code: String,

    /// Display name
    pub name: String,

    /// Creation timestamp
    pub created: DateTime<Utc>,
}

impl Entity for Company {
    const PREFIX: &'static str = "CORP";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.code
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Company {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Corp),
            code: code.into().trim().to_uppercase(),
            name: name.into().trim().to_string(),
            created: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), BomError> {
        if self.code.is_empty() {
            return Err(BomError::validation("company code must not be empty"));
        }
        if !self
            .code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(BomError::validation(format!(
                "company code '{}' may only contain letters, digits, '-' and '_'",
                self.code
            )));
        }
        if self.name.is_empty() {
            return Err(BomError::validation("company name must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_code_normalized() {
        let company = Company::new(" acme ", "Acme Manufacturing");
        assert_eq!(company.code, "ACME");
        assert!(company.validate().is_ok());
    }

    #[test]
    fn test_company_code_rejects_spaces() {
        let company = Company::new("AC ME", "Acme");
        assert!(company.validate().is_err());
    }

    #[test]
    fn test_entity_accessors() {
        let company = Company::new("acme", "Acme");
        assert_eq!(company.label(), "ACME");
        assert_eq!(Entity::created(&company), company.created);
        assert!(company.id().to_string().starts_with(Company::PREFIX));
    }
}
