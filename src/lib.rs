//! Forge: bill-of-materials and production planning toolkit
//!
//! Parts, multi-level BOMs and production orders for one or more companies,
//! stored in a local SQLite database and driven from the `forge` CLI.

pub mod bom;
pub mod cli;
pub mod core;
pub mod entities;
pub mod logging;
