//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    bom::BomCommands, company::CompanyCommands, completions::CompletionsArgs,
    config::ConfigCommands, import::ImportCommands, init::InitArgs, order::OrderCommands,
    part::PartCommands, report::ReportCommands, seed::SeedArgs,
};

#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about = "Bill-of-materials and production planning toolkit")]
#[command(
    long_about = "Manage parts, multi-level bills of materials and production orders in a local project database."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Company code to work in (default: config, or the only company)
    #[arg(long, short = 'c', global = true)]
    pub company: Option<String>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .forge/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new Forge project
    Init(InitArgs),

    /// Company management
    #[command(subcommand)]
    Company(CompanyCommands),

    /// Part inventory management
    #[command(subcommand)]
    Part(PartCommands),

    /// Bill of materials: lines, trees, explosion and costing
    #[command(subcommand)]
    Bom(BomCommands),

    /// Production order management and planning
    #[command(subcommand)]
    Order(OrderCommands),

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Import parts or BOM lines from CSV
    #[command(subcommand)]
    Import(ImportCommands),

    /// Load a demo company with a bicycle BOM
    Seed(SeedArgs),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
