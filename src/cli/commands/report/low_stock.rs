//! Low-stock report

use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::Workspace;
use crate::cli::GlobalOpts;
use crate::entities::{Company, Part};

use super::write_output;

#[derive(clap::Args, Debug)]
pub struct LowStockArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: LowStockArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let parts = ws.store.low_stock(company.id)?;

    write_output(&render(&company, &parts), args.output)
}

fn render(company: &Company, parts: &[Part]) -> String {
    let mut output = String::new();
    output.push_str(&format!("# Low Stock: {}\n\n", company.name));

    if parts.is_empty() {
        output.push_str("All parts are above their reorder level.\n");
        return output;
    }

    let mut builder = Builder::default();
    builder.push_record(["Part #", "Name", "Type", "On Hand", "Reorder Level", "Unit"]);
    for part in parts {
        builder.push_record([
            part.part_number.clone(),
            part.name.clone(),
            part.part_type.to_string(),
            part.stock_quantity.to_string(),
            part.reorder_level.to_string(),
            part.unit.clone(),
        ]);
    }
    output.push_str(&builder.build().with(Style::markdown()).to_string());
    output.push_str(&format!("\n\n**{} part(s) need reordering.**\n", parts.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PartType;

    #[test]
    fn test_render_lists_parts() {
        let company = Company::new("ACME", "Acme Cycles");
        let part = Part::new(company.id, "SPOKE", "Spoke", PartType::Component, "pcs").with_stock(3, 10);
        let report = render(&company, &[part]);
        assert!(report.starts_with("# Low Stock: Acme Cycles"));
        assert!(report.contains("| SPOKE"));
        assert!(report.contains("1 part(s) need reordering"));
    }

    #[test]
    fn test_render_empty() {
        let company = Company::new("ACME", "Acme Cycles");
        assert!(render(&company, &[]).contains("above their reorder level"));
    }
}
