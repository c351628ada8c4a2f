//! `forge company` command - Company management

use clap::Subcommand;
use miette::Result;

use crate::cli::helpers::{emit_structured, report_created, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::Company;

#[derive(Subcommand, Debug)]
pub enum CompanyCommands {
    /// Create a company
    New(NewArgs),

    /// List companies
    List,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Short code used to select the company (letters, digits, '-', '_')
    pub code: String,

    /// Display name
    pub name: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("name", "NAME", 40),
    ColumnDef::new("created", "CREATED", 12),
];

pub fn run(cmd: CompanyCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CompanyCommands::New(args) => run_new(args, global),
        CompanyCommands::List => run_list(global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = Company::new(&args.code, &args.name);
    ws.store.create_company(&company)?;

    report_created(
        &company,
        "company",
        &format!("({})", company.name),
        ws.format(global, OutputFormat::Tsv),
        global.quiet,
    )
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let companies = ws.store.companies()?;
    let format = ws.format(global, OutputFormat::Tsv);
    if emit_structured(&companies, format)? {
        return Ok(());
    }

    if companies.is_empty() {
        println!("No companies found.");
        return Ok(());
    }

    let rows: Vec<TableRow> = companies
        .iter()
        .map(|c| {
            TableRow::new(c.id.to_string())
                .cell("code", CellValue::Id(c.code.clone()))
                .cell("name", CellValue::Text(c.name.clone()))
                .cell("created", CellValue::Created(c.created))
        })
        .collect();
    TableFormatter::new(COLUMNS, "company").output(&rows, format);
    Ok(())
}
