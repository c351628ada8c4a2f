//! Diagnostic logging setup
//!
//! Logs go to stderr so they never mix with command output. `FORGE_LOG`
//! takes an `EnvFilter` directive and wins over the verbosity flags;
//! `FORGE_LOG_FORMAT=json` switches to one JSON object per line.

use std::env;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the filter directive
pub const LOG_ENV: &str = "FORGE_LOG";

/// Environment variable selecting `compact` (default) or `json` output
pub const LOG_FORMAT_ENV: &str = "FORGE_LOG_FORMAT";

/// Default directive for the given verbosity flags
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    match (verbose, quiet) {
        (true, _) => "forge=debug,warn",
        (false, true) => "error",
        (false, false) => "forge=warn",
    }
}

/// Install the global subscriber; later calls are ignored
pub fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let format = env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    let _ = match format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_wins_over_quiet() {
        assert_eq!(default_directive(true, true), "forge=debug,warn");
        assert_eq!(default_directive(false, true), "error");
        assert_eq!(default_directive(false, false), "forge=warn");
    }
}
