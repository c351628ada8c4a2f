//! `forge config` command - inspect the merged configuration

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{emit_structured, resolve_format};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::project::Project;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration values
    Show(ShowArgs),

    /// Show paths to configuration files
    Path,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("company", "Company code used when --company is not given"),
    ("default_unit", "Unit of measure for new BOM lines"),
    ("max_depth", "Maximum BOM depth followed by traversals"),
    ("default_format", "Default output format (yaml, json, tsv, etc.)"),
];

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Path => run_path(global),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    // Configuration is readable outside a project too
    let project = Project::locate(global.project.as_deref()).ok();
    let config = Config::load(project.as_ref());

    if let Some(key) = &args.key {
        return match get_config_value(&config, key) {
            Some(value) => {
                println!("{}", value);
                Ok(())
            }
            None if VALID_KEYS.iter().any(|(k, _)| k == key) => {
                Err(miette::miette!("Key '{}' is not set", key))
            }
            None => Err(miette::miette!(
                help = format!(
                    "valid keys: {}",
                    VALID_KEYS.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(", ")
                ),
                "Unknown configuration key '{}'",
                key
            )),
        };
    }

    let format = resolve_format(
        global.format,
        config.default_format.as_deref(),
        OutputFormat::Tsv,
    );
    if emit_structured(&config, format)? {
        return Ok(());
    }

    for (key, description) in VALID_KEYS {
        let value = get_config_value(&config, key);
        println!(
            "{:<16} {:<12} {}",
            style(key).bold(),
            value.unwrap_or_else(|| style("-").dim().to_string()),
            style(description).dim()
        );
    }
    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "company" => config.company.clone(),
        "default_unit" => Some(config.default_unit().to_string()),
        "max_depth" => Some(config.max_depth().to_string()),
        "default_format" => config.default_format.clone(),
        _ => None,
    }
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    match Config::global_config_path() {
        Some(path) => println!(
            "{:<8} {}{}",
            style("global").bold(),
            path.display(),
            if path.exists() { "" } else { " (not present)" }
        ),
        None => println!("{:<8} (no home directory)", style("global").bold()),
    }
    match Project::locate(global.project.as_deref()) {
        Ok(project) => println!(
            "{:<8} {}",
            style("project").bold(),
            project.config_path().display()
        ),
        Err(_) => println!("{:<8} (not in a Forge project)", style("project").bold()),
    }
    Ok(())
}
