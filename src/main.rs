use clap::Parser;
use forge::cli::commands;
use forge::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    // Terminate silently on a closed pipe (`forge part list | head`)
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    forge::logging::init_tracing(global.verbose, global.quiet);

    match cli.command {
        Commands::Init(args) => commands::init::run(args, &global),
        Commands::Company(cmd) => commands::company::run(cmd, &global),
        Commands::Part(cmd) => commands::part::run(cmd, &global),
        Commands::Bom(cmd) => commands::bom::run(cmd, &global),
        Commands::Order(cmd) => commands::order::run(cmd, &global),
        Commands::Report(cmd) => commands::report::run(cmd, &global),
        Commands::Import(cmd) => commands::import::run(cmd, &global),
        Commands::Seed(args) => commands::seed::run(args, &global),
        Commands::Config(cmd) => commands::config::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
