//! Common utilities for CSV import

use console::style;
use csv::{Reader, ReaderBuilder, StringRecord};
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

/// Import options shared by the row importers
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_errors: bool,
    /// Update existing parts instead of reporting duplicates
    pub update: bool,
}

/// Import statistics
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub rows_processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
}

/// What happened to one row
pub enum RowOutcome {
    Created(String),
    Updated(String),
}

/// Headers of the part CSV format
pub const PART_HEADERS: &[&str] = &[
    "part_number",
    "name",
    "type",
    "material_type",
    "stock",
    "reorder_level",
    "unit",
    "unit_cost",
    "description",
];

/// Headers of the BOM CSV format
pub const BOM_HEADERS: &[&str] = &["parent", "component", "quantity", "unit"];

pub fn open_reader(path: &Path) -> Result<Reader<BufReader<File>>> {
    if !path.exists() {
        return Err(miette::miette!("File not found: {}", path.display()));
    }
    let file = File::open(path).into_diagnostic()?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

/// Build a map from header name to column index
pub fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase().trim().to_string(), i))
        .collect()
}

/// Fail unless every `required` header is present
pub fn require_headers(header_map: &HashMap<String, usize>, required: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|h| !header_map.contains_key(*h))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "run 'forge import template' to see the expected columns",
            "CSV is missing column(s): {}",
            missing.join(", ")
        ))
    }
}

/// Get a field value from a CSV record
pub fn get_field(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    field: &str,
) -> Option<String> {
    header_map
        .get(field)
        .and_then(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Required field, or a row error naming it
pub fn required_field(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    field: &str,
) -> std::result::Result<String, String> {
    get_field(record, header_map, field).ok_or_else(|| format!("missing required field '{}'", field))
}

/// Parse an optional field, or a row error naming it
pub fn parse_field<T>(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    field: &str,
) -> std::result::Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_field(record, header_map, field)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| format!("invalid {} '{}': {}", field, raw, e))
        })
        .transpose()
}

/// Drive `handle` over every record, reporting per-row results
///
/// Row numbers are 1-based and count the header line. Without
/// `skip_errors` the first failing row aborts the import.
pub fn process_rows<F>(
    reader: &mut Reader<BufReader<File>>,
    options: ImportOptions,
    mut handle: F,
) -> Result<ImportStats>
where
    F: FnMut(&StringRecord, &HashMap<String, usize>) -> std::result::Result<RowOutcome, String>,
{
    let headers = reader.headers().into_diagnostic()?.clone();
    let header_map = build_header_map(&headers);
    let mut stats = ImportStats::default();

    for (row_idx, result) in reader.records().enumerate() {
        let row_num = row_idx + 2;
        stats.rows_processed += 1;

        let outcome = result
            .map_err(|e| format!("CSV parse error: {}", e))
            .and_then(|record| handle(&record, &header_map));

        let verb = if options.dry_run { "Would " } else { "" };
        match outcome {
            Ok(RowOutcome::Created(label)) => {
                stats.created += 1;
                println!(
                    "{} Row {}: {}create {}",
                    if options.dry_run { style("○").dim() } else { style("✓").green() },
                    row_num,
                    verb,
                    style(label).cyan()
                );
            }
            Ok(RowOutcome::Updated(label)) => {
                stats.updated += 1;
                println!(
                    "{} Row {}: {}update {}",
                    if options.dry_run { style("○").dim() } else { style("✓").yellow() },
                    row_num,
                    verb,
                    style(label).cyan()
                );
            }
            Err(message) => {
                stats.errors += 1;
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, message);
                tracing::debug!(row = row_num, %message, "import row rejected");
                if !options.skip_errors {
                    return Err(miette::miette!("Import stopped at row {}: {}", row_num, message));
                }
            }
        }
    }
    Ok(stats)
}

/// Print the CSV header line and an example row for a format
pub fn generate_template(headers: &[&str], example: &[&str]) {
    println!("{}", headers.join(","));
    println!("{}", example.join(","));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn test_header_map_is_case_insensitive() {
        let map = build_header_map(&record(&["Part_Number", " NAME "]));
        assert_eq!(map.get("part_number"), Some(&0));
        assert_eq!(map.get("name"), Some(&1));
    }

    #[test]
    fn test_get_field_skips_blank() {
        let map = build_header_map(&record(&["a", "b"]));
        let row = record(&["  x ", "   "]);
        assert_eq!(get_field(&row, &map, "a"), Some("x".to_string()));
        assert_eq!(get_field(&row, &map, "b"), None);
        assert_eq!(get_field(&row, &map, "missing"), None);
    }

    #[test]
    fn test_parse_field_reports_column() {
        let map = build_header_map(&record(&["stock"]));
        let err = parse_field::<i64>(&record(&["lots"]), &map, "stock").unwrap_err();
        assert!(err.contains("invalid stock 'lots'"));
        assert_eq!(parse_field::<i64>(&record(&["7"]), &map, "stock").unwrap(), Some(7));
    }

    #[test]
    fn test_require_headers() {
        let map = build_header_map(&record(&["parent", "component"]));
        assert!(require_headers(&map, &["parent"]).is_ok());
        assert!(require_headers(&map, &["parent", "quantity"]).is_err());
    }
}
