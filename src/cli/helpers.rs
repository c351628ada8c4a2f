//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use clap::ValueEnum;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use console::style;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Entity, Project, Store};
use crate::entities::{Company, Part};

/// Everything a command needs: the project, its merged configuration and an
/// open store
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub store: Store,
}

impl Workspace {
    /// Locate the project (from `--project` or the working directory) and open it
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = Project::locate(global.project.as_deref())?;
        let config = Config::load(Some(&project));
        let store = Store::open(&project)?;
        tracing::debug!(root = %project.root().display(), "opened project");
        Ok(Self {
            project,
            config,
            store,
        })
    }

    /// The active company: `--company`, then config, then the only company
    pub fn company(&self, global: &GlobalOpts) -> Result<Company> {
        let selected = global.company.as_deref().or(self.config.company.as_deref());
        if let Some(code) = selected {
            return Ok(self.store.company(code)?);
        }

        let mut companies = self.store.companies()?;
        match companies.len() {
            1 => Ok(companies.remove(0)),
            0 => Err(miette::miette!(
                help = "create one with 'forge company new CODE NAME' or run 'forge seed'",
                "no company exists yet"
            )),
            n => Err(miette::miette!(
                help = "pass --company CODE or set company in .forge/config.yaml",
                "{} companies exist; choose one",
                n
            )),
        }
    }

    /// Resolve a part by full id or part number within the company
    pub fn part(&self, company: &Company, reference: &str) -> Result<Part> {
        Ok(self.store.resolve_part(company.id, reference)?)
    }

    /// Output format: the flag, then the configured default, then `auto`
    pub fn format(&self, global: &GlobalOpts, auto: OutputFormat) -> OutputFormat {
        resolve_format(global.format, self.config.default_format.as_deref(), auto)
    }
}

/// Pick the effective output format
pub fn resolve_format(
    requested: OutputFormat,
    configured: Option<&str>,
    auto: OutputFormat,
) -> OutputFormat {
    let chosen = match requested {
        OutputFormat::Auto => configured
            .and_then(|name| OutputFormat::from_str(name, true).ok())
            .unwrap_or(OutputFormat::Auto),
        other => other,
    };
    match chosen {
        OutputFormat::Auto => auto,
        other => other,
    }
}

/// Print `value` as JSON or YAML; returns false for the other formats
pub fn emit_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Output for a newly created entity: its id, the full record, or a
/// confirmation line
pub fn report_created<E: Entity>(
    entity: &E,
    noun: &str,
    detail: &str,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    if format == OutputFormat::Id {
        println!("{}", entity.id());
        return Ok(());
    }
    if emit_structured(entity, format)? || quiet {
        return Ok(());
    }
    println!(
        "{} Created {} {} {}",
        style("✓").green(),
        noun,
        style(entity.label()).cyan(),
        detail
    );
    tracing::debug!(id = %entity.id(), kind = E::PREFIX, created = %entity.created(), "created entity");
    Ok(())
}

/// Render a quantity without trailing zeros (2, 0.5, 1.125)
pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 && quantity.abs() < 1e15 {
        format!("{:.0}", quantity)
    } else {
        let s = format!("{:.4}", quantity);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            resolve_format(OutputFormat::Auto, None, OutputFormat::Tsv),
            OutputFormat::Tsv
        );
        assert_eq!(
            resolve_format(OutputFormat::Auto, Some("json"), OutputFormat::Tsv),
            OutputFormat::Json
        );
        assert_eq!(
            resolve_format(OutputFormat::Csv, Some("json"), OutputFormat::Tsv),
            OutputFormat::Csv
        );
        assert_eq!(
            resolve_format(OutputFormat::Auto, Some("bogus"), OutputFormat::Yaml),
            OutputFormat::Yaml
        );
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(0.5), "0.5");
        assert_eq!(format_quantity(1.125), "1.125");
        assert_eq!(format_quantity(72.0), "72");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }
}
