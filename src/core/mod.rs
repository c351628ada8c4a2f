//! Core module - identity, project layout, configuration and storage

pub mod config;
pub mod entity;
pub mod identity;
pub mod project;
pub mod store;

pub use config::Config;
pub use entity::Entity;
pub use identity::{EntityId, EntityPrefix, IdParseError, PartId};
pub use project::{Project, ProjectError};
pub use store::{CompletionSummary, OrderPlan, PartFilter, PlanLine, Store, StoreError};
