//! `forge bom` command - BOM lines, trees, explosion and costing

use std::collections::HashMap;

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::bom::TreeLine;
use crate::cli::helpers::{emit_structured, format_quantity, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{PartFilter, PartId};
use crate::entities::{BomItem, Company, Part};

#[derive(Subcommand, Debug)]
pub enum BomCommands {
    /// Add a component to a parent, or update the existing line
    Add(AddArgs),

    /// Remove a component from a parent (no error if absent)
    Remove(PairArgs),

    /// List the direct components of a part
    Children(PartArgs),

    /// List the parts that directly use a part
    WhereUsed(PartArgs),

    /// Show the indented multi-level BOM
    Tree(QuantityArgs),

    /// Total lowest-level requirements for a quantity of a part
    Explode(QuantityArgs),

    /// Roll up material cost over the exploded leaves
    Cost(QuantityArgs),

    /// Audit the stored BOM for cycles
    Check,

    /// Export the flattened tree as rows
    Export(QuantityArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Parent part (number or PART-... id)
    pub parent: String,

    /// Component part (number or PART-... id)
    pub component: String,

    /// Quantity of the component per parent unit
    pub quantity: f64,

    /// Unit of measure (default: the component's stock unit)
    #[arg(long, short = 'u')]
    pub unit: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PairArgs {
    /// Parent part (number or PART-... id)
    pub parent: String,

    /// Component part (number or PART-... id)
    pub component: String,
}

#[derive(clap::Args, Debug)]
pub struct PartArgs {
    /// Part number or PART-... id
    pub part: String,
}

#[derive(clap::Args, Debug)]
pub struct QuantityArgs {
    /// Root part number or PART-... id
    pub part: String,

    /// Quantity of the root part
    #[arg(long = "qty", short = 'n', default_value_t = 1.0)]
    pub quantity: f64,
}

const LINE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("part_number", "PART #", 20),
    ColumnDef::new("name", "NAME", 32),
    ColumnDef::new("quantity", "QTY", 10),
    ColumnDef::new("unit", "UNIT", 6),
];

const EXPLODE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("part_number", "PART #", 20),
    ColumnDef::new("name", "NAME", 32),
    ColumnDef::new("quantity", "QTY", 12),
    ColumnDef::new("unit", "UNIT", 6),
    ColumnDef::new("level", "LEVEL", 6),
    ColumnDef::new("stock", "STOCK", 8),
];

const COST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("part_number", "PART #", 20),
    ColumnDef::new("quantity", "QTY", 12),
    ColumnDef::new("unit", "UNIT", 6),
    ColumnDef::new("unit_cost", "UNIT COST", 12),
    ColumnDef::new("extended", "EXTENDED", 14),
];

/// Header of exported rows
const EXPORT_HEADER: [&str; 7] = [
    "level",
    "parent",
    "component",
    "name",
    "quantity",
    "extended_quantity",
    "unit",
];

pub fn run(cmd: BomCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BomCommands::Add(args) => run_add(args, global),
        BomCommands::Remove(args) => run_remove(args, global),
        BomCommands::Children(args) => run_lines(args, global, Direction::Children),
        BomCommands::WhereUsed(args) => run_lines(args, global, Direction::WhereUsed),
        BomCommands::Tree(args) => run_tree(args, global),
        BomCommands::Explode(args) => run_explode(args, global),
        BomCommands::Cost(args) => run_cost(args, global),
        BomCommands::Check => run_check(global),
        BomCommands::Export(args) => run_export(args, global),
    }
}

/// All parts of the company keyed by id, for labelling graph output
fn part_index(ws: &Workspace, company: &Company) -> Result<HashMap<PartId, Part>> {
    Ok(ws
        .store
        .parts(company.id, &PartFilter::default())?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

fn label(parts: &HashMap<PartId, Part>, id: PartId) -> String {
    parts
        .get(&id)
        .map(|p| p.part_number.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Line unit, or the part's stock unit for a unitless leaf-root line
pub(crate) fn unit_of(parts: &HashMap<PartId, Part>, id: PartId, unit: &str) -> String {
    if unit.is_empty() {
        parts.get(&id).map(|p| p.unit.clone()).unwrap_or_default()
    } else {
        unit.to_string()
    }
}

fn name(parts: &HashMap<PartId, Part>, id: PartId) -> String {
    parts.get(&id).map(|p| p.name.clone()).unwrap_or_default()
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let parent = ws.part(&company, &args.parent)?;
    let component = ws.part(&company, &args.component)?;
    let unit = args
        .unit
        .unwrap_or_else(|| component.line_unit(ws.config.default_unit()).to_string());

    let previous = ws
        .store
        .add_or_update_edge(parent.id, component.id, args.quantity, &unit)?;

    if global.quiet {
        return Ok(());
    }
    match previous {
        Some(old) => println!(
            "{} Updated {} -> {}: {} {} (was {} {})",
            style("✓").green(),
            style(&parent.part_number).cyan(),
            style(&component.part_number).cyan(),
            format_quantity(args.quantity),
            unit.trim(),
            format_quantity(old.quantity),
            old.unit
        ),
        None => println!(
            "{} Added {} -> {}: {} {}",
            style("✓").green(),
            style(&parent.part_number).cyan(),
            style(&component.part_number).cyan(),
            format_quantity(args.quantity),
            unit.trim()
        ),
    }
    Ok(())
}

fn run_remove(args: PairArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let parent = ws.part(&company, &args.parent)?;
    let component = ws.part(&company, &args.component)?;

    let removed = ws.store.remove_edge(parent.id, component.id)?;
    if !global.quiet {
        if removed {
            println!(
                "{} Removed {} from {}",
                style("✓").green(),
                style(&component.part_number).cyan(),
                style(&parent.part_number).cyan()
            );
        } else {
            println!(
                "{} {} is not a component of {}",
                style("-").dim(),
                component.part_number,
                parent.part_number
            );
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Direction {
    Children,
    WhereUsed,
}

/// BOM line labelled with part numbers
#[derive(Serialize)]
struct LabelledLine {
    parent: String,
    component: String,
    quantity: f64,
    unit: String,
}

fn run_lines(args: PartArgs, global: &GlobalOpts, direction: Direction) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let part = ws.part(&company, &args.part)?;
    let parts = part_index(&ws, &company)?;

    let items: Vec<BomItem> = match direction {
        Direction::Children => ws.store.children(part.id)?,
        Direction::WhereUsed => ws.store.where_used(part.id)?,
    };

    let format = ws.format(global, OutputFormat::Tsv);
    let labelled: Vec<LabelledLine> = items
        .iter()
        .map(|item| LabelledLine {
            parent: label(&parts, item.parent),
            component: label(&parts, item.component),
            quantity: item.quantity,
            unit: item.unit.clone(),
        })
        .collect();
    if emit_structured(&labelled, format)? {
        return Ok(());
    }

    if items.is_empty() {
        match direction {
            Direction::Children => println!("{} has no components.", part.part_number),
            Direction::WhereUsed => println!("{} is not used in any BOM.", part.part_number),
        }
        return Ok(());
    }

    let rows: Vec<TableRow> = items
        .iter()
        .map(|item| {
            let other = match direction {
                Direction::Children => item.component,
                Direction::WhereUsed => item.parent,
            };
            TableRow::new(other.to_string())
                .cell("part_number", CellValue::Id(label(&parts, other)))
                .cell("name", CellValue::Text(name(&parts, other)))
                .cell("quantity", CellValue::Quantity(item.quantity))
                .cell("unit", CellValue::Text(item.unit.clone()))
        })
        .collect();
    let noun = match direction {
        Direction::Children => "component",
        Direction::WhereUsed => "parent",
    };
    TableFormatter::new(LINE_COLUMNS, noun).output(&rows, format);
    Ok(())
}

/// Tree line labelled with part numbers
#[derive(Serialize)]
struct LabelledTreeLine {
    level: usize,
    parent: String,
    component: String,
    name: String,
    quantity: f64,
    extended_quantity: f64,
    unit: String,
}

fn labelled_tree(lines: &[TreeLine], parts: &HashMap<PartId, Part>) -> Vec<LabelledTreeLine> {
    lines
        .iter()
        .map(|line| LabelledTreeLine {
            level: line.level,
            parent: label(parts, line.parent),
            component: label(parts, line.component),
            name: name(parts, line.component),
            quantity: line.quantity,
            extended_quantity: line.extended_quantity,
            unit: line.unit.clone(),
        })
        .collect()
}

/// Whether no later sibling follows line `idx` under the same parent
fn is_last_sibling(lines: &[TreeLine], idx: usize) -> bool {
    let level = lines[idx].level;
    for line in &lines[idx + 1..] {
        if line.level < level {
            return true;
        }
        if line.level == level {
            return false;
        }
    }
    true
}

/// Render tree lines with box-drawing connectors
pub(crate) fn render_tree(lines: &[TreeLine], parts: &HashMap<PartId, Part>) -> Vec<String> {
    let mut rendered = Vec::with_capacity(lines.len());
    // For each ancestor level: whether more siblings follow it
    let mut open: Vec<bool> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let last = is_last_sibling(lines, idx);
        open.truncate(line.level.saturating_sub(1));
        let prefix: String = open
            .iter()
            .map(|&more| if more { "│  " } else { "   " })
            .collect();
        let branch = if last { "└─ " } else { "├─ " };
        open.push(!last);

        rendered.push(format!(
            "{}{}{} {} x {} {}",
            prefix,
            branch,
            label(parts, line.component),
            name(parts, line.component),
            format_quantity(line.extended_quantity),
            line.unit
        ));
    }
    rendered
}

fn run_tree(args: QuantityArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let root = ws.part(&company, &args.part)?;
    let parts = part_index(&ws, &company)?;

    let graph = ws.store.snapshot(company.id)?;
    let lines = graph.tree(root.id, args.quantity, ws.config.max_depth())?;

    let format = ws.format(global, OutputFormat::Tsv);
    if emit_structured(&labelled_tree(&lines, &parts), format)? {
        return Ok(());
    }
    if matches!(format, OutputFormat::Csv | OutputFormat::Md) {
        return write_export_rows(&lines, &parts, format);
    }

    println!(
        "{} {} x {}",
        style(&root.part_number).cyan().bold(),
        root.name,
        format_quantity(args.quantity)
    );
    for row in render_tree(&lines, &parts) {
        println!("{}", row);
    }
    Ok(())
}

/// Explosion line labelled with part data
#[derive(Serialize)]
struct LabelledExplodedLine {
    part_number: String,
    name: String,
    quantity: f64,
    unit: String,
    level: usize,
    stock: i64,
}

fn run_explode(args: QuantityArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let root = ws.part(&company, &args.part)?;
    let parts = part_index(&ws, &company)?;

    let graph = ws.store.snapshot(company.id)?;
    let explosion = graph.explode(root.id, args.quantity, ws.config.max_depth())?;

    let labelled: Vec<LabelledExplodedLine> = explosion
        .lines
        .iter()
        .map(|line| LabelledExplodedLine {
            part_number: label(&parts, line.part),
            name: name(&parts, line.part),
            quantity: line.quantity,
            unit: unit_of(&parts, line.part, &line.unit),
            level: line.level,
            stock: parts.get(&line.part).map_or(0, |p| p.stock_quantity),
        })
        .collect();

    let format = ws.format(global, OutputFormat::Tsv);
    if emit_structured(&labelled, format)? {
        return Ok(());
    }

    if format == OutputFormat::Tsv && !global.quiet {
        println!(
            "{} Requirements for {} x {}",
            style("→").blue(),
            style(&root.part_number).cyan(),
            format_quantity(args.quantity)
        );
        println!();
    }

    let rows: Vec<TableRow> = explosion
        .lines
        .iter()
        .zip(&labelled)
        .map(|(line, l)| {
            TableRow::new(line.part.to_string())
                .cell("part_number", CellValue::Id(l.part_number.clone()))
                .cell("name", CellValue::Text(l.name.clone()))
                .cell("quantity", CellValue::Quantity(l.quantity))
                .cell("unit", CellValue::Text(l.unit.clone()))
                .cell("level", CellValue::Number(l.level as i64))
                .cell("stock", CellValue::Number(l.stock))
        })
        .collect();
    TableFormatter::new(EXPLODE_COLUMNS, "requirement").output(&rows, format);
    Ok(())
}

#[derive(Serialize)]
struct LabelledCost {
    part: String,
    quantity: f64,
    total: f64,
    lines: Vec<LabelledCostLine>,
    unpriced: Vec<String>,
}

#[derive(Serialize)]
struct LabelledCostLine {
    part_number: String,
    quantity: f64,
    unit: String,
    unit_cost: Option<f64>,
    extended_cost: f64,
}

fn run_cost(args: QuantityArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let root = ws.part(&company, &args.part)?;
    let parts = part_index(&ws, &company)?;

    let graph = ws.store.snapshot(company.id)?;
    let costs = ws.store.unit_costs(company.id)?;
    let rollup = graph.rollup_cost(root.id, args.quantity, &costs, ws.config.max_depth())?;

    let format = ws.format(global, OutputFormat::Tsv);
    let labelled = LabelledCost {
        part: root.part_number.clone(),
        quantity: args.quantity,
        total: rollup.total,
        lines: rollup
            .lines
            .iter()
            .map(|line| LabelledCostLine {
                part_number: label(&parts, line.part),
                quantity: line.quantity,
                unit: unit_of(&parts, line.part, &line.unit),
                unit_cost: line.unit_cost,
                extended_cost: line.extended_cost,
            })
            .collect(),
        unpriced: rollup.unpriced.iter().map(|id| label(&parts, *id)).collect(),
    };
    if emit_structured(&labelled, format)? {
        return Ok(());
    }
    if format == OutputFormat::Id {
        println!("{:.2}", rollup.total);
        return Ok(());
    }

    let rows: Vec<TableRow> = rollup
        .lines
        .iter()
        .zip(&labelled.lines)
        .map(|(line, l)| {
            TableRow::new(line.part.to_string())
                .cell("part_number", CellValue::Id(l.part_number.clone()))
                .cell("quantity", CellValue::Quantity(l.quantity))
                .cell("unit", CellValue::Text(l.unit.clone()))
                .cell("unit_cost", CellValue::Money(l.unit_cost))
                .cell("extended", CellValue::Money(Some(l.extended_cost)))
        })
        .collect();
    TableFormatter::new(COST_COLUMNS, "line")
        .without_summary()
        .output(&rows, format);

    if format == OutputFormat::Tsv {
        println!();
        println!(
            "{} {} x {}: {}",
            style("Total material cost").bold(),
            style(&root.part_number).cyan(),
            format_quantity(args.quantity),
            style(format!("{:.2}", rollup.total)).green().bold()
        );
        if !labelled.unpriced.is_empty() {
            println!(
                "{} No unit cost for: {} (counted as 0)",
                style("!").yellow(),
                labelled.unpriced.join(", ")
            );
        }
    }
    Ok(())
}

fn run_check(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let parts = part_index(&ws, &company)?;

    let graph = ws.store.snapshot(company.id)?;
    let cycles = graph.find_cycles();

    if cycles.is_empty() {
        if !global.quiet {
            println!(
                "{} BOM of {} is acyclic ({} part(s), {} line(s))",
                style("✓").green(),
                style(&company.code).cyan(),
                graph.part_count(),
                graph.edge_count()
            );
        }
        return Ok(());
    }

    for cycle in &cycles {
        let names: Vec<String> = cycle.iter().map(|id| label(&parts, *id)).collect();
        eprintln!("{} cycle: {}", style("✗").red(), names.join(" -> "));
    }
    Err(miette::miette!(
        help = "remove one line of each cycle with 'forge bom remove PARENT COMPONENT'",
        "found {} BOM cycle(s)",
        cycles.len()
    ))
}

fn run_export(args: QuantityArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let root = ws.part(&company, &args.part)?;
    let parts = part_index(&ws, &company)?;

    let graph = ws.store.snapshot(company.id)?;
    let lines = graph.tree(root.id, args.quantity, ws.config.max_depth())?;

    let format = match ws.format(global, OutputFormat::Csv) {
        OutputFormat::Auto | OutputFormat::Id => OutputFormat::Csv,
        other => other,
    };
    write_export_rows(&lines, &parts, format)
}

/// Flattened tree as a header row followed by one row per line
pub(crate) fn export_rows(lines: &[TreeLine], parts: &HashMap<PartId, Part>) -> Vec<Vec<String>> {
    let mut rows = vec![EXPORT_HEADER.iter().map(|h| h.to_string()).collect()];
    rows.extend(lines.iter().map(|line| {
        vec![
            line.level.to_string(),
            label(parts, line.parent),
            label(parts, line.component),
            name(parts, line.component),
            format_quantity(line.quantity),
            format_quantity(line.extended_quantity),
            line.unit.clone(),
        ]
    }));
    rows
}

fn write_export_rows(
    lines: &[TreeLine],
    parts: &HashMap<PartId, Part>,
    format: OutputFormat,
) -> Result<()> {
    let rows = export_rows(lines, parts);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&rows).into_diagnostic()?);
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            for row in rows {
                builder.push_record(row);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Tsv => {
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }
        _ => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                writer.write_record(&row).into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::BomGraph;
    use crate::core::{EntityId, EntityPrefix};
    use crate::entities::PartType;

    fn parts_for(ids: &[(PartId, &str)]) -> HashMap<PartId, Part> {
        let company = EntityId::new(EntityPrefix::Corp);
        ids.iter()
            .map(|(id, number)| {
                let mut part = Part::new(company, *number, *number, PartType::Component, "pcs");
                part.id = *id;
                (*id, part)
            })
            .collect()
    }

    fn bike() -> (Vec<TreeLine>, HashMap<PartId, Part>) {
        let ids: Vec<PartId> = (0..4).map(|_| EntityId::new(EntityPrefix::Part)).collect();
        let (bike, frame, wheel, spoke) = (ids[0], ids[1], ids[2], ids[3]);
        let mut graph = BomGraph::new();
        graph.add_or_update_edge(bike, frame, 1.0, "pcs").unwrap();
        graph.add_or_update_edge(bike, wheel, 2.0, "pcs").unwrap();
        graph.add_or_update_edge(wheel, spoke, 36.0, "pcs").unwrap();
        let lines = graph.tree(bike, 1.0, 64).unwrap();
        let parts = parts_for(&[
            (bike, "BIKE"),
            (frame, "FRAME"),
            (wheel, "WHEEL"),
            (spoke, "SPOKE"),
        ]);
        (lines, parts)
    }

    #[test]
    fn test_render_tree_connectors() {
        let (lines, parts) = bike();
        let rendered = render_tree(&lines, &parts);
        assert_eq!(rendered.len(), 3);
        assert!(rendered[0].starts_with("├─ FRAME"));
        assert!(rendered[1].starts_with("└─ WHEEL"));
        assert!(rendered[2].starts_with("   └─ SPOKE"));
        assert!(rendered[2].ends_with("x 72 pcs"));
    }

    #[test]
    fn test_export_rows_have_header() {
        let (lines, parts) = bike();
        let rows = export_rows(&lines, &parts);
        assert_eq!(rows[0][0], "level");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], vec!["2", "WHEEL", "SPOKE", "SPOKE", "36", "72", "pcs"]);
    }
}
