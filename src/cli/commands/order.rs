//! `forge order` command - Production orders

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{emit_structured, format_quantity, report_created, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{OrderPlan, PlanLine, Store};
use crate::entities::{Company, OrderStatus, ProductionOrder};

#[derive(Subcommand, Debug)]
pub enum OrderCommands {
    /// Create a production order
    New(NewArgs),

    /// List production orders
    List(ListArgs),

    /// Show an order with its material plan
    Show(OrderArgs),

    /// Material requirements of an order against stock on hand
    Plan(OrderArgs),

    /// Move a planned order to IN_PROGRESS
    Start(OrderArgs),

    /// Complete an in-progress order, consuming components and adding stock
    Complete(CompleteArgs),

    /// Cancel an open order
    Cancel(OrderArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Order number, unique within the company
    pub order_number: String,

    /// Part to build (number or PART-... id)
    pub part: String,

    /// Whole units to build
    pub quantity: i64,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status (planned, in-progress, completed, cancelled)
    #[arg(long, short = 's')]
    pub status: Option<OrderStatus>,
}

#[derive(clap::Args, Debug)]
pub struct OrderArgs {
    /// Order number or ORD-... id
    pub order: String,
}

#[derive(clap::Args, Debug)]
pub struct CompleteArgs {
    /// Order number or ORD-... id
    pub order: String,

    /// Complete even when components are short, drawing them down to zero
    #[arg(long)]
    pub force: bool,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("order_number", "ORDER #", 16),
    ColumnDef::new("part", "PART #", 20),
    ColumnDef::new("quantity", "QTY", 8),
    ColumnDef::new("status", "STATUS", 12),
    ColumnDef::new("due", "DUE", 12),
    ColumnDef::new("created", "CREATED", 12),
];

const PLAN_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("part_number", "PART #", 20),
    ColumnDef::new("name", "NAME", 28),
    ColumnDef::new("required", "REQUIRED", 10),
    ColumnDef::new("on_hand", "ON HAND", 10),
    ColumnDef::new("shortage", "SHORTAGE", 10),
    ColumnDef::new("unit", "UNIT", 14),
];

pub fn run(cmd: OrderCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        OrderCommands::New(args) => run_new(args, global),
        OrderCommands::List(args) => run_list(args, global),
        OrderCommands::Show(args) => run_show(args, global),
        OrderCommands::Plan(args) => run_plan(args, global),
        OrderCommands::Start(args) => run_transition(args, global, OrderStatus::InProgress),
        OrderCommands::Complete(args) => run_complete(args, global),
        OrderCommands::Cancel(args) => run_transition(args, global, OrderStatus::Cancelled),
    }
}

fn part_number(store: &Store, order: &ProductionOrder) -> String {
    store
        .part(order.part_id)
        .map(|p| p.part_number)
        .unwrap_or_else(|_| order.part_id.to_string())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let part = ws.part(&company, &args.part)?;

    let mut order = ProductionOrder::new(company.id, &args.order_number, part.id, args.quantity);
    if let Some(due) = args.due {
        order = order.with_due_date(due);
    }
    ws.store.create_order(&order)?;

    report_created(
        &order,
        "order",
        &format!("for {} x {}", order.quantity, part.part_number),
        ws.format(global, OutputFormat::Tsv),
        global.quiet,
    )
}

fn order_rows(store: &Store, orders: &[ProductionOrder]) -> Vec<TableRow> {
    orders
        .iter()
        .map(|o| {
            TableRow::new(o.id.to_string())
                .cell("order_number", CellValue::Id(o.order_number.clone()))
                .cell("part", CellValue::Text(part_number(store, o)))
                .cell("quantity", CellValue::Number(o.quantity))
                .cell("status", CellValue::OrderStatus(o.status))
                .cell("due", CellValue::Date(o.due_date))
                .cell("created", CellValue::Created(o.created))
        })
        .collect()
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let orders = ws.store.orders(company.id, args.status)?;

    let format = ws.format(global, OutputFormat::Tsv);
    if emit_structured(&orders, format)? {
        return Ok(());
    }
    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }
    TableFormatter::new(COLUMNS, "order").output(&order_rows(&ws.store, &orders), format);
    Ok(())
}

fn load_order(ws: &Workspace, company: &Company, reference: &str) -> Result<ProductionOrder> {
    Ok(ws.store.order(company.id, reference)?)
}

/// Stock unit, followed by any other units the BOM lines were written in
fn plan_unit(line: &PlanLine) -> String {
    if line.foreign_units.is_empty() {
        line.unit.clone()
    } else {
        format!("{} (+{})", line.unit, line.foreign_units.join(","))
    }
}

fn print_plan(plan: &OrderPlan, format: OutputFormat) {
    let rows: Vec<TableRow> = plan
        .lines
        .iter()
        .map(|line| {
            TableRow::new(line.part_id.to_string())
                .cell("part_number", CellValue::Id(line.part_number.clone()))
                .cell("name", CellValue::Text(line.name.clone()))
                .cell("required", CellValue::Quantity(line.required))
                .cell("on_hand", CellValue::Number(line.on_hand))
                .cell("shortage", CellValue::Quantity(line.shortage))
                .cell("unit", CellValue::Text(plan_unit(line)))
        })
        .collect();
    TableFormatter::new(PLAN_COLUMNS, "requirement")
        .without_summary()
        .output(&rows, format);

    if format == OutputFormat::Tsv {
        println!();
        if plan.lines.is_empty() {
            println!("{} nothing to consume", style("-").dim());
        } else if plan.is_feasible() {
            println!("{} stock covers every requirement", style("✓").green());
        } else {
            let short = plan.lines.iter().filter(|l| l.shortage > 0.0).count();
            println!(
                "{} {} part(s) short",
                style("✗").red(),
                style(short).red().bold()
            );
        }
    }
}

fn run_show(args: OrderArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let order = load_order(&ws, &company, &args.order)?;

    match ws.format(global, OutputFormat::Auto) {
        OutputFormat::Id => {
            println!("{}", order.id);
            return Ok(());
        }
        OutputFormat::Auto => {}
        format => {
            if emit_structured(&order, format)? {
                return Ok(());
            }
            TableFormatter::new(COLUMNS, "order")
                .without_summary()
                .output(&order_rows(&ws.store, std::slice::from_ref(&order)), format);
            return Ok(());
        }
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&order.id.to_string()).cyan());
    println!(
        "{}: {}",
        style("Order Number").bold(),
        style(&order.order_number).yellow()
    );
    println!(
        "{}: {} x {}",
        style("Builds").bold(),
        order.quantity,
        part_number(&ws.store, &order)
    );
    println!("{}: {}", style("Status").bold(), order.status);
    if let Some(due) = order.due_date {
        println!("{}: {}", style("Due").bold(), due);
    }
    println!(
        "{}: {}",
        style("Created").dim(),
        order.created.format("%Y-%m-%d %H:%M")
    );
    println!("{}", style("─".repeat(60)).dim());

    if order.status.is_open() {
        println!();
        println!("{}", style("Material plan:").bold());
        let plan = ws.store.plan_order(&order, ws.config.max_depth())?;
        print_plan(&plan, OutputFormat::Tsv);
    }
    Ok(())
}

fn run_plan(args: OrderArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let order = load_order(&ws, &company, &args.order)?;
    let plan = ws.store.plan_order(&order, ws.config.max_depth())?;

    let format = ws.format(global, OutputFormat::Tsv);
    if emit_structured(&plan, format)? {
        return Ok(());
    }
    if format == OutputFormat::Tsv && !global.quiet {
        println!(
            "{} Plan for {}: {} x {}",
            style("→").blue(),
            style(&order.order_number).cyan(),
            order.quantity,
            part_number(&ws.store, &order)
        );
        println!();
    }
    print_plan(&plan, format);
    Ok(())
}

fn run_transition(args: OrderArgs, global: &GlobalOpts, next: OrderStatus) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let order = load_order(&ws, &company, &args.order)?;

    let updated = ws.store.transition_order(order.id, next)?;
    if !global.quiet {
        println!(
            "{} {} {} -> {}",
            style("✓").green(),
            style(&updated.order_number).cyan(),
            order.status,
            style(updated.status).bold()
        );
    }
    Ok(())
}

fn run_complete(args: CompleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let company = ws.company(global)?;
    let order = load_order(&ws, &company, &args.order)?;

    let summary = ws.store.complete_order(order.id, args.force)?;

    let format = ws.format(global, OutputFormat::Tsv);
    if emit_structured(&summary, format)? || global.quiet {
        return Ok(());
    }

    println!(
        "{} Completed {}: +{} {}",
        style("✓").green(),
        style(&summary.order.order_number).cyan(),
        summary.produced,
        part_number(&ws.store, &summary.order)
    );
    for (number, units) in &summary.consumed {
        println!("  {} -{}", style(number).cyan(), units);
    }
    for (number, missing) in &summary.shortfalls {
        println!(
            "  {} {} short by {} (forced)",
            style("!").yellow(),
            number,
            format_quantity(*missing as f64)
        );
    }
    Ok(())
}
