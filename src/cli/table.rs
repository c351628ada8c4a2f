//! Table formatting utilities for CLI list commands
//!
//! Commands describe their columns once and hand over typed rows; the
//! formatter renders them as aligned TSV, CSV, Markdown or bare IDs.

use chrono::{DateTime, Local, NaiveDate, Utc};
use console::style;

use crate::cli::helpers::{escape_csv, format_quantity, truncate_str};
use crate::cli::OutputFormat;
use crate::entities::OrderStatus;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Entity ID or part number (cyan)
    Id(String),
    /// Plain text, truncated to the column width
    Text(String),
    /// Entity type or category
    Type(String),
    /// Production order status with color coding
    OrderStatus(OrderStatus),
    /// Stock level, red when at or below the reorder level
    Stock { on_hand: i64, reorder_level: i64 },
    /// Integer value
    Number(i64),
    /// Quantity without trailing zeros
    Quantity(f64),
    /// Optional money amount with two decimals ("-" when missing)
    Money(Option<f64>),
    /// Calendar date
    Date(Option<NaiveDate>),
    /// Timestamp displayed as local date
    Created(DateTime<Utc>),
    /// Empty/placeholder
    Empty,
}

impl CellValue {
    /// Format for TSV output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => format!("{:<width$}", style(id).cyan(), width = width),
            CellValue::Text(s) | CellValue::Type(s) => {
                let truncated = truncate_str(s, width.saturating_sub(2));
                format!("{:<width$}", truncated, width = width)
            }
            CellValue::OrderStatus(status) => {
                let s = status.to_string();
                let styled = match status {
                    OrderStatus::Planned => style(s).dim(),
                    OrderStatus::InProgress => style(s).yellow(),
                    OrderStatus::Completed => style(s).green(),
                    OrderStatus::Cancelled => style(s).red().dim(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Stock {
                on_hand,
                reorder_level,
            } => {
                let styled = if on_hand <= reorder_level {
                    style(on_hand.to_string()).red().bold()
                } else {
                    style(on_hand.to_string()).green()
                };
                format!("{:>width$}", styled, width = width)
            }
            other => {
                let raw = other.raw();
                let raw = if raw.is_empty() { "-".to_string() } else { raw };
                if other.is_numeric() {
                    format!("{:>width$}", raw, width = width)
                } else {
                    format!("{:<width$}", raw, width = width)
                }
            }
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        escape_csv(&self.raw())
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = self.raw();
        let raw = if raw.is_empty() { "-".to_string() } else { raw };
        raw.replace('|', "\\|")
    }

    /// Get raw string value (no formatting)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(s) | CellValue::Text(s) | CellValue::Type(s) => s.clone(),
            CellValue::OrderStatus(status) => status.to_string(),
            CellValue::Stock { on_hand, .. } => on_hand.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Quantity(q) => format_quantity(*q),
            CellValue::Money(m) => m.map(|v| format!("{:.2}", v)).unwrap_or_default(),
            CellValue::Date(d) => d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            CellValue::Created(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%d").to_string()
            }
            CellValue::Empty => String::new(),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            CellValue::Number(_)
                | CellValue::Quantity(_)
                | CellValue::Money(_)
                | CellValue::Stock { .. }
        )
    }

    /// Get the display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        self.raw().chars().count().max(1)
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            show_summary: true,
        }
    }

    /// Hide the "N item(s) found" line
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Output rows in the specified format (JSON/YAML are handled by callers)
    pub fn output(&self, rows: &[TableRow], format: OutputFormat) {
        match format {
            OutputFormat::Csv => self.output_csv(rows),
            OutputFormat::Md => self.output_md(rows),
            OutputFormat::Id => self.output_ids(rows),
            _ => self.output_tsv(rows),
        }
    }

    /// Calculate dynamic column widths based on actual content
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(|v| v.display_width())
                    .max()
                    .unwrap_or(0);
                // +2 keeps text columns from truncating what fits
                let natural = col.header.len().max(max_content.saturating_add(2));
                natural.min(col.width)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, &w)| format!("{:<width$}", style(col.header).bold(), width = w))
            .collect();
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, &w)| match row.get(col.key) {
                    Some(value) => value.format_tsv(w),
                    None => format!("{:<width$}", "-", width = w),
                })
                .collect();
            println!("{}", parts.join(" ").trim_end());
        }

        if self.show_summary {
            println!();
            println!("{} {}(s) found.", style(rows.len()).cyan(), self.entity_name);
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.key).collect();
        println!("{}", headers.join(","));

        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| row.get(col.key).map(CellValue::format_csv).unwrap_or_default())
                .collect();
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header).collect();
        println!("| {} |", headers.join(" | "));

        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        println!("|{}|", separators.join("|"));

        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| {
                    row.get(col.key)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            println!("| {} |", values.join(" | "));
        }
    }

    fn output_ids(&self, rows: &[TableRow]) {
        for row in rows {
            println!("{}", row.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_text_format() {
        let cell = CellValue::Text("Hello World".to_string());
        let tsv = cell.format_tsv(20);
        assert!(tsv.contains("Hello World"));
        assert_eq!(cell.format_csv(), "Hello World");
        assert_eq!(cell.format_md(), "Hello World");
    }

    #[test]
    fn test_cell_value_status_format() {
        let cell = CellValue::OrderStatus(OrderStatus::InProgress);
        assert_eq!(cell.format_csv(), "IN_PROGRESS");
        assert_eq!(cell.format_md(), "IN_PROGRESS");
    }

    #[test]
    fn test_cell_value_money() {
        assert_eq!(CellValue::Money(Some(12.5)).format_csv(), "12.50");
        assert_eq!(CellValue::Money(None).format_csv(), "");
        assert_eq!(CellValue::Money(None).format_md(), "-");
    }

    #[test]
    fn test_cell_value_quantity() {
        assert_eq!(CellValue::Quantity(72.0).raw(), "72");
        assert_eq!(CellValue::Quantity(0.25).raw(), "0.25");
    }

    #[test]
    fn test_cell_value_md_escapes_pipes() {
        let cell = CellValue::Text("a|b|c".to_string());
        assert_eq!(cell.format_md(), "a\\|b\\|c");
    }

    #[test]
    fn test_cell_value_csv_escapes_commas() {
        let cell = CellValue::Text("bolt, M6".to_string());
        assert_eq!(cell.format_csv(), "\"bolt, M6\"");
    }

    #[test]
    fn test_table_row_builder() {
        let row = TableRow::new("PART-123")
            .cell("name", CellValue::Text("Frame".to_string()))
            .cell("stock", CellValue::Number(4));

        assert_eq!(row.id, "PART-123");
        assert!(row.get("name").is_some());
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_widths_capped_by_column() {
        let columns = [ColumnDef::new("name", "NAME", 8)];
        let formatter = TableFormatter::new(&columns, "part");
        let rows = vec![TableRow::new("x").cell("name", CellValue::Text("a very long name".into()))];
        assert_eq!(formatter.calculate_widths(&rows), vec![8]);
    }
}
