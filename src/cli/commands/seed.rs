//! `forge seed` command - Load a demo company

use console::style;
use miette::Result;

use crate::cli::helpers::Workspace;
use crate::cli::GlobalOpts;
use crate::core::{Store, StoreError};
use crate::entities::{Company, MaterialType, Part, PartType, ProductionOrder};

#[derive(clap::Args, Debug)]
pub struct SeedArgs {
    /// Code of the demo company
    #[arg(long, default_value = "DEMO")]
    pub code: String,

    /// Name of the demo company
    #[arg(long, default_value = "Demo Cycles")]
    pub name: String,
}

/// Counts of what the seed created
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub parts: usize,
    pub lines: usize,
    pub orders: usize,
}

struct DemoPart {
    number: &'static str,
    name: &'static str,
    part_type: PartType,
    material: Option<MaterialType>,
    unit: &'static str,
    stock: i64,
    reorder: i64,
    cost: Option<f64>,
}

#[allow(clippy::too_many_arguments)]
const fn demo(
    number: &'static str,
    name: &'static str,
    part_type: PartType,
    material: Option<MaterialType>,
    unit: &'static str,
    stock: i64,
    reorder: i64,
    cost: Option<f64>,
) -> DemoPart {
    DemoPart {
        number,
        name,
        part_type,
        material,
        unit,
        stock,
        reorder,
        cost,
    }
}

const DEMO_PARTS: &[DemoPart] = &[
    demo("BIKE-100", "City bike", PartType::Product, None, "pcs", 0, 0, None),
    demo("FRAME-10", "Frame", PartType::Assembly, Some(MaterialType::Metal), "pcs", 2, 1, None),
    demo("WHEEL-26", "26\" wheel", PartType::Assembly, Some(MaterialType::Metal), "pcs", 4, 2, None),
    demo("TUBE-AL", "Aluminium tube", PartType::RawMaterial, Some(MaterialType::Metal), "m", 40, 10, Some(6.5)),
    demo("RIM-26", "26\" rim", PartType::Component, Some(MaterialType::Metal), "pcs", 10, 4, Some(18.0)),
    demo("SPOKE-2", "2mm spoke", PartType::Component, Some(MaterialType::Metal), "pcs", 300, 144, Some(0.35)),
    demo("HUB-F", "Front hub", PartType::Component, Some(MaterialType::Metal), "pcs", 6, 4, Some(22.0)),
    demo("BOLT-M6", "M6 bolt", PartType::Component, Some(MaterialType::Metal), "pcs", 120, 50, Some(0.12)),
    demo("SEAT-01", "Saddle", PartType::Component, Some(MaterialType::Textile), "pcs", 3, 5, Some(14.9)),
    demo("GREASE", "Bearing grease", PartType::RawMaterial, Some(MaterialType::Chemical), "g", 500, 100, None),
];

/// `(parent, component, quantity, unit)`; BOLT-M6 is shared by three parents
const DEMO_LINES: &[(&str, &str, f64, &str)] = &[
    ("BIKE-100", "FRAME-10", 1.0, "pcs"),
    ("BIKE-100", "WHEEL-26", 2.0, "pcs"),
    ("BIKE-100", "SEAT-01", 1.0, "pcs"),
    ("BIKE-100", "BOLT-M6", 6.0, "pcs"),
    ("FRAME-10", "TUBE-AL", 3.2, "m"),
    ("FRAME-10", "BOLT-M6", 4.0, "pcs"),
    ("WHEEL-26", "RIM-26", 1.0, "pcs"),
    ("WHEEL-26", "SPOKE-2", 36.0, "pcs"),
    ("WHEEL-26", "HUB-F", 1.0, "pcs"),
    ("WHEEL-26", "BOLT-M6", 2.0, "pcs"),
    ("WHEEL-26", "GREASE", 15.0, "g"),
];

pub fn run(args: SeedArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = Company::new(&args.code, &args.name);
    let summary = seed_demo(&mut ws.store, &company)?;

    if !global.quiet {
        println!(
            "{} Seeded company {} ({}): {} parts, {} BOM lines, {} order",
            style("✓").green(),
            style(&company.code).cyan(),
            company.name,
            summary.parts,
            summary.lines,
            summary.orders
        );
        println!();
        println!("Try:");
        println!(
            "  {}",
            style(format!("forge -c {} bom tree BIKE-100", company.code)).yellow()
        );
        println!(
            "  {}",
            style(format!("forge -c {} order plan WO-0001", company.code)).yellow()
        );
    }
    Ok(())
}

/// Create the demo company through the regular store operations
pub(crate) fn seed_demo(store: &mut Store, company: &Company) -> Result<SeedSummary, StoreError> {
    store.create_company(company)?;
    let mut summary = SeedSummary::default();

    for spec in DEMO_PARTS {
        let mut part = Part::new(company.id, spec.number, spec.name, spec.part_type, spec.unit)
            .with_stock(spec.stock, spec.reorder);
        if let Some(material) = spec.material {
            part = part.with_material(material);
        }
        if let Some(cost) = spec.cost {
            part = part.with_unit_cost(cost);
        }
        store.create_part(&part)?;
        summary.parts += 1;
    }

    for (parent, component, quantity, unit) in DEMO_LINES {
        let parent = store.part_by_number(company.id, parent)?;
        let component = store.part_by_number(company.id, component)?;
        store.add_or_update_edge(parent.id, component.id, *quantity, unit)?;
        summary.lines += 1;
    }

    let bike = store.part_by_number(company.id, "BIKE-100")?;
    store.create_order(&ProductionOrder::new(company.id, "WO-0001", bike.id, 5))?;
    summary.orders += 1;

    tracing::info!(company = %company.code, parts = summary.parts, lines = summary.lines, "seeded demo data");
    Ok(summary)
}
