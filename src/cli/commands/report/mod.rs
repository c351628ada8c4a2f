//! `forge report` command - Generate Markdown reports

mod bom;
mod low_stock;

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::cli::GlobalOpts;

pub use bom::BomArgs;
pub use low_stock::LowStockArgs;

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Parts at or below their reorder level
    LowStock(LowStockArgs),

    /// Indented bill of materials with optional cost rollup
    Bom(BomArgs),
}

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::LowStock(args) => low_stock::run(args, global),
        ReportCommands::Bom(args) => bom::run(args, global),
    }
}

pub(crate) fn write_output(content: &str, output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            println!("Report written to: {}", path.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
