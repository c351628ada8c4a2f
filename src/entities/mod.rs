//! Entity type definitions
//!
//! Forge supports the following entity types:
//!
//! - [`Company`] - Tenancy boundary; every part and order belongs to one
//! - [`Part`] - Raw materials, components, assemblies and products with stock levels
//! - [`BomItem`] - "parent requires quantity of component" edges
//! - [`ProductionOrder`] - Requests to build a quantity of a part

pub mod bom_item;
pub mod company;
pub mod order;
pub mod part;

pub use bom_item::BomItem;
pub use company::Company;
pub use order::{OrderStatus, ProductionOrder};
pub use part::{MaterialType, Part, PartType};
