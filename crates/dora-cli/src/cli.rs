//! Command-line interface definition.
//!
//! Four long-running-or-once subcommands share the global verbosity flags:
//!
//! - `dora worker` — one analyzer worker (scale out by running more)
//! - `dora ingest` — the ingress HTTP server
//! - `dora graphd` — the graph-service HTTP server
//! - `dora check`  — validate configuration and connectivity, then exit

use clap::{Parser, Subcommand};

/// Doraemon - CI blast-radius analysis for JavaScript/TypeScript repositories
#[derive(Parser, Debug)]
#[command(
    name = "dora",
    version,
    about = "CI blast-radius analysis for JavaScript/TypeScript repositories",
    long_about = "Doraemon maintains a per-repository import graph under advancing\n\
                  commits and computes, for each change, the set of files that could\n\
                  be impacted: the changed files plus all their transitive importers.\n\
                  CI runners use that set to test and lint only what matters."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an analyzer worker: consume jobs, reconcile graphs, publish
    /// blast radii
    Worker,

    /// Run the ingress HTTP server (POST /trigger)
    Ingest,

    /// Run the graph-service HTTP server (read queries and internal
    /// mutations)
    Graphd,

    /// Validate configuration and connectivity without processing anything
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_worker_with_verbose() {
        let cli = Cli::parse_from(["dora", "--verbose", "worker"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Worker));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["dora", "-v", "-q", "check"]).is_err());
    }
}
