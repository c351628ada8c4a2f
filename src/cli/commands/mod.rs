//! CLI command implementations

pub mod bom;
pub mod company;
pub mod completions;
pub mod config;
pub mod import;
pub mod init;
pub mod order;
pub mod part;
pub mod report;
pub mod seed;
