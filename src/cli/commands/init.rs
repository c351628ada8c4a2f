//! `forge init` command - Initialize a new Forge project

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::project::{Project, ProjectError};
use crate::core::Store;
use crate::entities::Company;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Display name of the first company (created when --company is given)
    #[arg(long)]
    pub company_name: Option<String>,

    /// Reinitialize even if .forge/ already exists (the database is emptied)
    #[arg(long)]
    pub force: bool,
}

/// With the global `--company CODE`, a first company is created and recorded
/// as the project default.
pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    if args.company_name.is_some() && global.company.is_none() {
        return Err(miette::miette!(
            help = "forge init --company ACME --company-name \"Acme Manufacturing\"",
            "--company-name needs --company"
        ));
    }

    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    let project = match project {
        Ok(project) => project,
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} Forge project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("forge init --force").yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut store = Store::open(&project)?;
    println!(
        "{} Initialized Forge project at {}",
        style("✓").green(),
        style(project.root().display()).cyan()
    );

    if let Some(code) = global.company.as_deref() {
        let name = args.company_name.as_deref().unwrap_or(code);
        let company = Company::new(code, name);
        store.create_company(&company)?;
        set_default_company(&project, &company.code)?;
        println!(
            "{} Created company {} ({})",
            style("✓").green(),
            style(&company.code).cyan(),
            company.name
        );
    }

    println!();
    println!("Next steps:");
    if global.company.is_none() {
        println!(
            "  {} Create a company",
            style("forge company new ACME \"Acme Manufacturing\"").yellow()
        );
    }
    println!("  {} Add a part", style("forge part new FRAME --name \"Frame\"").yellow());
    println!("  {} Or load the demo data", style("forge seed").yellow());
    Ok(())
}

/// Record the company as the project default in .forge/config.yaml
fn set_default_company(project: &Project, code: &str) -> Result<()> {
    let path = project.config_path();
    let contents = std::fs::read_to_string(&path).into_diagnostic()?;
    let updated = if contents.contains("# company: \"\"") {
        contents.replace("# company: \"\"", &format!("company: {}", code))
    } else {
        format!("{}\ncompany: {}\n", contents.trim_end(), code)
    };
    std::fs::write(&path, updated).into_diagnostic()
}
