//! `forge import` command - Import parts and BOM lines from CSV files

mod bom;
mod common;
mod parts;

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::cli::helpers::Workspace;
use crate::cli::GlobalOpts;

pub use common::{ImportOptions, ImportStats};

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Import parts (part_number,name,type,material_type,stock,reorder_level,unit,unit_cost,description)
    Parts(ImportArgs),

    /// Import BOM lines (parent,component,quantity,unit)
    Bom(ImportArgs),

    /// Print a CSV template for an import format
    Template(TemplateArgs),
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: PathBuf,

    /// Validate the CSV without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Continue importing after errors (default: stop on first error)
    #[arg(long)]
    pub skip_errors: bool,

    /// Update parts whose part number already exists
    #[arg(long)]
    pub update: bool,
}

#[derive(clap::Args, Debug)]
pub struct TemplateArgs {
    /// Import format (parts or bom)
    #[arg(value_parser = ["parts", "bom"])]
    pub kind: String,
}

pub fn run(cmd: ImportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ImportCommands::Parts(args) => run_import(args, global, Kind::Parts),
        ImportCommands::Bom(args) => run_import(args, global, Kind::Bom),
        ImportCommands::Template(args) => {
            if args.kind == "bom" {
                common::generate_template(common::BOM_HEADERS, &["BIKE", "WHEEL", "2", "pcs"]);
            } else {
                common::generate_template(
                    common::PART_HEADERS,
                    &[
                        "WHEEL", "Wheel", "assembly", "metal", "10", "4", "pcs", "42.50", "",
                    ],
                );
            }
            Ok(())
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Parts,
    Bom,
}

fn run_import(args: ImportArgs, global: &GlobalOpts, kind: Kind) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let default_unit = ws.config.default_unit().to_string();
    let options = ImportOptions {
        dry_run: args.dry_run,
        skip_errors: args.skip_errors,
        update: args.update,
    };

    let mut reader = common::open_reader(&args.file)?;
    let header_map = common::build_header_map(reader.headers().into_diagnostic()?);
    let noun = match kind {
        Kind::Parts => {
            common::require_headers(&header_map, &["part_number"])?;
            "parts"
        }
        Kind::Bom => {
            common::require_headers(&header_map, &["parent", "component", "quantity"])?;
            "BOM lines"
        }
    };

    if !global.quiet {
        println!(
            "{} Importing {} into {} from {}{}",
            style("→").blue(),
            noun,
            style(&company.code).cyan(),
            style(args.file.display()).yellow(),
            if args.dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
        println!();
    }

    let stats = match kind {
        Kind::Parts => {
            let mut importer = parts::PartRowImporter {
                store: &mut ws.store,
                company: &company,
                default_unit: &default_unit,
                dry_run: options.dry_run,
                update: options.update,
                seen: HashSet::new(),
            };
            common::process_rows(&mut reader, options, |record, map| {
                importer.import_row(record, map)
            })?
        }
        Kind::Bom => {
            let preview = if options.dry_run {
                Some(ws.store.snapshot(company.id)?)
            } else {
                None
            };
            let mut importer = bom::BomRowImporter {
                store: &mut ws.store,
                company: &company,
                default_unit: &default_unit,
                preview,
            };
            common::process_rows(&mut reader, options, |record, map| {
                importer.import_row(record, map)
            })?
        }
    };

    tracing::info!(
        kind = noun,
        rows = stats.rows_processed,
        created = stats.created,
        updated = stats.updated,
        errors = stats.errors,
        dry_run = options.dry_run,
        "import finished"
    );
    print_summary(&stats, options);
    Ok(())
}

fn print_summary(stats: &ImportStats, options: ImportOptions) {
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed: {}", style(stats.rows_processed).cyan());
    println!("  Created:        {}", style(stats.created).green());
    if stats.updated > 0 {
        println!("  Updated:        {}", style(stats.updated).yellow());
    }
    if stats.errors > 0 {
        println!("  Errors:         {}", style(stats.errors).red());
    }
    if options.dry_run {
        println!();
        println!("{}", style("Dry run complete. Nothing was written.").yellow());
    }
}
