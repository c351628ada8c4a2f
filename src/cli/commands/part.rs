//! `forge part` command - Part inventory management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{emit_structured, format_quantity, report_created, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::PartFilter;
use crate::entities::{MaterialType, Part, PartType};

#[derive(Subcommand, Debug)]
pub enum PartCommands {
    /// Create a new part
    New(NewArgs),

    /// List parts with filtering
    List(ListArgs),

    /// Show a part's details
    Show(ShowArgs),

    /// Delete a part
    Delete(DeleteArgs),

    /// Adjust stock on hand by a signed delta
    Stock(StockArgs),

    /// Change a part's descriptive fields, cost or reorder level
    Set(SetArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Part number, unique within the company
    pub part_number: String,

    /// Display name (default: the part number)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Part type (raw-material, component, assembly, product)
    #[arg(long = "type", short = 't', default_value = "component")]
    pub part_type: PartType,

    /// Material (metal, plastic, electronic, chemical, textile, other)
    #[arg(long, short = 'm')]
    pub material: Option<MaterialType>,

    /// Initial stock on hand
    #[arg(long, default_value_t = 0)]
    pub stock: i64,

    /// Reorder level
    #[arg(long, default_value_t = 0)]
    pub reorder: i64,

    /// Unit of measure (default: configured default unit)
    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    /// Cost per unit
    #[arg(long)]
    pub cost: Option<f64>,

    /// Description
    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by part type
    #[arg(long = "type", short = 't')]
    pub part_type: Option<PartType>,

    /// Search in part number and name
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Only parts at or below their reorder level
    #[arg(long)]
    pub low_stock: bool,

    /// Show only the count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Part number or full PART-... id
    pub part: String,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Part number or full PART-... id
    pub part: String,

    /// Also remove every BOM line that references the part
    #[arg(long)]
    pub cascade: bool,
}

#[derive(clap::Args, Debug)]
pub struct StockArgs {
    /// Part number or full PART-... id
    pub part: String,

    /// Units to add (negative to remove)
    #[arg(allow_negative_numbers = true)]
    pub delta: i64,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Part number or full PART-... id
    pub part: String,

    #[arg(long, short = 'n')]
    pub name: Option<String>,

    #[arg(long = "type", short = 't')]
    pub part_type: Option<PartType>,

    #[arg(long, short = 'm')]
    pub material: Option<MaterialType>,

    #[arg(long)]
    pub reorder: Option<i64>,

    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    /// Cost per unit
    #[arg(long, conflicts_with = "clear_cost")]
    pub cost: Option<f64>,

    /// Remove the unit cost
    #[arg(long)]
    pub clear_cost: bool,

    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("part_number", "PART #", 20),
    ColumnDef::new("name", "NAME", 32),
    ColumnDef::new("type", "TYPE", 14),
    ColumnDef::new("stock", "STOCK", 8),
    ColumnDef::new("reorder", "REORDER", 8),
    ColumnDef::new("unit", "UNIT", 6),
    ColumnDef::new("cost", "COST", 10),
];

pub fn run(cmd: PartCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PartCommands::New(args) => run_new(args, global),
        PartCommands::List(args) => run_list(args, global),
        PartCommands::Show(args) => run_show(args, global),
        PartCommands::Delete(args) => run_delete(args, global),
        PartCommands::Stock(args) => run_stock(args, global),
        PartCommands::Set(args) => run_set(args, global),
    }
}

/// Table rows for a list of parts
pub(crate) fn part_rows(parts: &[Part]) -> Vec<TableRow> {
    parts
        .iter()
        .map(|p| {
            TableRow::new(p.id.to_string())
                .cell("part_number", CellValue::Id(p.part_number.clone()))
                .cell("name", CellValue::Text(p.name.clone()))
                .cell("type", CellValue::Type(p.part_type.to_string()))
                .cell(
                    "stock",
                    CellValue::Stock {
                        on_hand: p.stock_quantity,
                        reorder_level: p.reorder_level,
                    },
                )
                .cell("reorder", CellValue::Number(p.reorder_level))
                .cell("unit", CellValue::Text(p.unit.clone()))
                .cell("cost", CellValue::Money(p.unit_cost))
        })
        .collect()
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;

    let unit = args
        .unit
        .unwrap_or_else(|| ws.config.default_unit().to_string());
    let name = args.name.unwrap_or_else(|| args.part_number.clone());

    let mut part = Part::new(company.id, &args.part_number, name, args.part_type, unit)
        .with_stock(args.stock, args.reorder);
    if let Some(material) = args.material {
        part = part.with_material(material);
    }
    if let Some(cost) = args.cost {
        part = part.with_unit_cost(cost);
    }
    if let Some(description) = args.description {
        part = part.with_description(description);
    }

    ws.store.create_part(&part)?;

    report_created(
        &part,
        "part",
        &format!("- {}", part.name),
        ws.format(global, OutputFormat::Tsv),
        global.quiet,
    )
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;

    let filter = PartFilter {
        part_type: args.part_type,
        search: args.search,
        low_stock: args.low_stock,
    };
    let parts = ws.store.parts(company.id, &filter)?;

    if args.count {
        println!("{}", parts.len());
        return Ok(());
    }

    let format = ws.format(global, OutputFormat::Tsv);
    if emit_structured(&parts, format)? {
        return Ok(());
    }
    if parts.is_empty() {
        println!("No parts found.");
        return Ok(());
    }

    TableFormatter::new(COLUMNS, "part").output(&part_rows(&parts), format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let part = ws.part(&company, &args.part)?;

    match ws.format(global, OutputFormat::Auto) {
        OutputFormat::Id => {
            println!("{}", part.id);
            return Ok(());
        }
        OutputFormat::Auto => {}
        format => {
            if emit_structured(&part, format)? {
                return Ok(());
            }
            TableFormatter::new(COLUMNS, "part")
                .without_summary()
                .output(&part_rows(std::slice::from_ref(&part)), format);
            return Ok(());
        }
    }

    let children = ws.store.children(part.id)?;
    let parents = ws.store.where_used(part.id)?;
    let below = ws
        .store
        .snapshot(company.id)?
        .descendants(part.id, ws.config.max_depth())?;

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&part.id.to_string()).cyan());
    println!(
        "{}: {}",
        style("Part Number").bold(),
        style(&part.part_number).yellow()
    );
    println!("{}: {}", style("Name").bold(), part.name);
    println!("{}: {}", style("Type").bold(), part.part_type);
    if let Some(material) = part.material_type {
        println!("{}: {}", style("Material").bold(), material);
    }
    println!("{}", style("─".repeat(60)).dim());

    println!();
    println!("{}", style("Inventory:").bold());
    let stock = if part.needs_reorder() {
        style(part.stock_quantity.to_string()).red().bold()
    } else {
        style(part.stock_quantity.to_string()).green()
    };
    println!("  {}: {} {}", style("On hand").dim(), stock, part.unit);
    println!("  {}: {}", style("Reorder level").dim(), part.reorder_level);
    match part.unit_cost {
        Some(cost) => println!("  {}: {:.2}", style("Unit cost").dim(), cost),
        None => println!("  {}: {}", style("Unit cost").dim(), style("not set").dim()),
    }

    if let Some(ref description) = part.description {
        println!();
        println!("{}", style("Description:").bold());
        println!("  {}", description);
    }

    println!();
    println!(
        "{}: {} component(s), {} part(s) at all levels, used in {} parent(s)",
        style("BOM").bold(),
        children.len(),
        below.len(),
        parents.len()
    );
    for item in &children {
        let component = ws.store.part(item.component)?;
        println!(
            "  {} {} {}",
            style(&component.part_number).cyan(),
            format_quantity(item.quantity),
            item.unit
        );
    }

    println!();
    println!(
        "{}: {}",
        style("Created").dim(),
        part.created.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let part = ws.part(&company, &args.part)?;

    let removed = ws.store.delete_part(part.id, args.cascade)?;
    if !global.quiet {
        println!(
            "{} Deleted part {}",
            style("✓").green(),
            style(&part.part_number).cyan()
        );
        if removed > 0 {
            println!("  removed {} BOM line(s)", removed);
        }
    }
    Ok(())
}

fn run_stock(args: StockArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let part = ws.part(&company, &args.part)?;

    let stock = ws.store.adjust_stock(part.id, args.delta)?;
    if global.quiet {
        return Ok(());
    }
    println!(
        "{} {} stock {} -> {} {}",
        style("✓").green(),
        style(&part.part_number).cyan(),
        part.stock_quantity,
        style(stock).bold(),
        part.unit
    );
    if stock <= part.reorder_level {
        println!(
            "  {} at or below reorder level ({})",
            style("!").yellow(),
            part.reorder_level
        );
    }
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let mut part = ws.part(&company, &args.part)?;

    if let Some(name) = args.name {
        part.name = name.trim().to_string();
    }
    if let Some(part_type) = args.part_type {
        part.part_type = part_type;
    }
    if let Some(material) = args.material {
        part.material_type = Some(material);
    }
    if let Some(reorder) = args.reorder {
        part.reorder_level = reorder;
    }
    if let Some(unit) = args.unit {
        part.unit = unit.trim().to_string();
    }
    if let Some(cost) = args.cost {
        part.unit_cost = Some(cost);
    }
    if args.clear_cost {
        part.unit_cost = None;
    }
    if let Some(description) = args.description {
        part.description = Some(description);
    }

    ws.store.update_part(&part)?;
    if !global.quiet {
        println!(
            "{} Updated part {}",
            style("✓").green(),
            style(&part.part_number).cyan()
        );
    }
    Ok(())
}
