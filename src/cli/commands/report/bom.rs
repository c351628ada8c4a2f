//! BOM (Bill of Materials) report

use miette::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::bom::CostRollup;
use crate::cli::commands::bom::{render_tree, unit_of};
use crate::cli::helpers::{format_quantity, Workspace};
use crate::cli::GlobalOpts;
use crate::core::{PartFilter, PartId};
use crate::entities::Part;

use super::write_output;

#[derive(clap::Args, Debug)]
pub struct BomArgs {
    /// Root part (number or PART-... id)
    pub part: String,

    /// Quantity of the root part
    #[arg(long = "qty", short = 'n', default_value_t = 1.0)]
    pub quantity: f64,

    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Include cost rollup
    #[arg(long)]
    pub with_cost: bool,
}

pub fn run(args: BomArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let root = ws.part(&company, &args.part)?;
    let parts: HashMap<PartId, Part> = ws
        .store
        .parts(company.id, &PartFilter::default())?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let graph = ws.store.snapshot(company.id)?;
    let max_depth = ws.config.max_depth();
    let lines = graph.tree(root.id, args.quantity, max_depth)?;

    let mut output = String::new();
    output.push_str(&format!("# Bill of Materials: {}\n\n", root.name));
    output.push_str(&format!("Part Number: {}\n", root.part_number));
    output.push_str(&format!("Quantity: {}\n\n", format_quantity(args.quantity)));

    output.push_str("```\n");
    output.push_str(&format!("{} {}\n", root.part_number, root.name));
    for row in render_tree(&lines, &parts) {
        output.push_str(&row);
        output.push('\n');
    }
    output.push_str("```\n");

    if args.with_cost {
        let costs = ws.store.unit_costs(company.id)?;
        let rollup = graph.rollup_cost(root.id, args.quantity, &costs, max_depth)?;
        output.push_str("\n## Cost Rollup\n\n");
        output.push_str(&cost_table(&rollup, &parts));
    }

    write_output(&output, args.output)
}

fn cost_table(rollup: &CostRollup, parts: &HashMap<PartId, Part>) -> String {
    let number = |id: &PartId| {
        parts
            .get(id)
            .map(|p| p.part_number.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let mut builder = Builder::default();
    builder.push_record(["Part #", "Quantity", "Unit", "Unit Cost", "Extended"]);
    for line in &rollup.lines {
        builder.push_record([
            number(&line.part),
            format_quantity(line.quantity),
            unit_of(parts, line.part, &line.unit),
            line.unit_cost
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string()),
            format!("{:.2}", line.extended_cost),
        ]);
    }

    let mut table = builder.build().with(Style::markdown()).to_string();
    table.push_str(&format!("\n\n**Total material cost: {:.2}**\n", rollup.total));
    if !rollup.unpriced.is_empty() {
        let names: Vec<String> = rollup.unpriced.iter().map(number).collect();
        table.push_str(&format!("\nNo unit cost for: {}\n", names.join(", ")));
    }
    table
}
